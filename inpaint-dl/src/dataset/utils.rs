use crate::common::*;

/// Load an image as a `[C, H, W]` uint8 tensor with exactly 3 channels,
/// promoting grayscale and dropping alpha.
pub fn load_image<P>(path: P) -> Result<Tensor>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let image = vision::image::load(path)
        .with_context(|| format!("failed to load image file {}", path.display()))?;

    let channels = image.size()[0];
    let image = match channels {
        1 => image.repeat(&[3, 1, 1]),
        3 => image,
        4 => image.narrow(0, 0, 3),
        _ => bail!(
            "unsupported channel count {} in {}",
            channels,
            path.display()
        ),
    };
    Ok(image)
}

/// Center-crop a `[C, H, W]` uint8 tensor to a square (optional), then
/// resize to `height` × `width`.
pub fn resize(image: &Tensor, height: i64, width: i64, center_crop: bool) -> Result<Tensor> {
    let size = image.size();
    let (img_h, img_w) = (size[1], size[2]);

    let image = if center_crop && img_h != img_w {
        let side = img_h.min(img_w);
        let top = (img_h - side) / 2;
        let left = (img_w - side) / 2;
        image.narrow(1, top, side).narrow(2, left, side)
    } else {
        image.shallow_clone()
    };

    let resized = vision::image::resize(&image, width, height)?;
    Ok(resized)
}

/// uint8 `[0, 255]` to float `[0, 1]`.
pub fn to_float(image: &Tensor) -> Tensor {
    image.to_kind(Kind::Float) / 255.0
}

/// Luma conversion of a `[C, H, W]` float image to `[H, W]`.
pub fn rgb_to_gray(image: &Tensor) -> Tensor {
    let size = image.size();
    let (height, width) = (size[1], size[2]);

    match size[0] {
        1 => image.reshape(&[height, width]),
        _ => {
            let weights = Tensor::of_slice(&[0.2125f32, 0.7154, 0.0721])
                .to_device(image.device())
                .view([3, 1, 1]);
            (image * weights).sum_dim_intlist(&[0], false, Kind::Float)
        }
    }
}

/// Horizontal flip of a `[.., W]` tensor along its last axis.
pub fn hflip(image: &Tensor) -> Tensor {
    image.flip(&[image.dim() as i64 - 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_center_crops_to_square() {
        let image = Tensor::zeros(&[3, 100, 60], (Kind::Uint8, Device::Cpu));
        let resized = resize(&image, 32, 32, true).unwrap();
        assert_eq!(resized.size(), vec![3, 32, 32]);
    }

    #[test]
    fn gray_conversion_weights_sum_to_one() {
        let image = Tensor::ones(&[3, 4, 4], (Kind::Float, Device::Cpu));
        let gray = rgb_to_gray(&image);
        assert_eq!(gray.size(), vec![4, 4]);
        let max_err = f64::from((gray - 1.0).abs().max());
        approx::assert_abs_diff_eq!(max_err, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn hflip_reverses_columns() {
        let image = Tensor::of_slice(&[1.0f32, 2.0, 3.0, 4.0]).view([1, 2, 2]);
        let flipped = hflip(&image);
        let values = Vec::<f32>::from(&flipped.reshape(&[4]));
        assert_eq!(values, vec![2.0, 1.0, 4.0, 3.0]);
    }
}
