//! Gaussian-derivative edge detector over tch tensors.

use crate::common::*;

const LOW_THRESHOLD: f64 = 0.1;
const HIGH_THRESHOLD: f64 = 0.2;

/// Binary Canny edge map of a grayscale image.
///
/// `image` is `[H, W]` float in `[0, 1]`. The optional detection `mask`
/// (`[H, W]`, nonzero = detectable) restricts where edges may be reported;
/// it is eroded by one pixel so the mask boundary itself never reads as an
/// edge. Returns a `[H, W]` float tensor with values in {0, 1}.
pub fn canny(image: &Tensor, sigma: f64, mask: Option<&Tensor>) -> Result<Tensor> {
    ensure!(sigma > 0.0, "sigma must be positive, got {}", sigma);
    let size = image.size();
    ensure!(size.len() == 2, "expected a [H, W] image, got {:?}", size);
    let (height, width) = (size[0], size[1]);
    ensure!(
        height > 2 && width > 2,
        "image {}x{} too small for edge detection",
        height,
        width
    );

    let mask = match mask {
        Some(mask) => mask.gt(0.0).to_kind(Kind::Float),
        None => Tensor::ones(&[height, width], (Kind::Float, image.device())),
    };

    // smooth inside the mask only; dividing by the smoothed mask keeps the
    // filter response flat up to the mask boundary
    let smoothed_mask = gaussian_blur(&mask, sigma);
    let smoothed = gaussian_blur(&(image * &mask), sigma) / smoothed_mask.clamp_min(1e-12);

    let gx = conv2d_same(&smoothed, &sobel_kernel_x(image.device()));
    let gy = conv2d_same(&smoothed, &sobel_kernel_y(image.device()));
    let magnitude = gx.hypot(&gy);

    // no responses on the mask boundary or the image border
    let magnitude = magnitude * erode(&mask) * border_mask(height, width, image.device());

    let thin = non_max_suppression(&magnitude, &gx, &gy);
    Ok(hysteresis(&thin))
}

fn gaussian_kernel(sigma: f64, device: Device) -> Tensor {
    let radius = (4.0 * sigma + 0.5) as i64;
    let taps: Vec<f32> = (-radius..=radius)
        .map(|x| (-((x * x) as f64) / (2.0 * sigma * sigma)).exp() as f32)
        .collect();
    let kernel = Tensor::of_slice(&taps).to_device(device);
    &kernel / kernel.sum(Kind::Float)
}

/// Separable Gaussian smoothing of a `[H, W]` tensor.
fn gaussian_blur(image: &Tensor, sigma: f64) -> Tensor {
    let size = image.size();
    let (height, width) = (size[0], size[1]);

    let kernel = gaussian_kernel(sigma, image.device());
    let k = kernel.size()[0];
    let r = k / 2;

    let xs = image.view([1, 1, height, width]);
    let xs = xs.conv2d(
        &kernel.view([1, 1, k, 1]),
        None::<Tensor>,
        &[1, 1],
        &[r, 0],
        &[1, 1],
        1,
    );
    let xs = xs.conv2d(
        &kernel.view([1, 1, 1, k]),
        None::<Tensor>,
        &[1, 1],
        &[0, r],
        &[1, 1],
        1,
    );
    xs.view([height, width])
}

fn sobel_kernel_x(device: Device) -> Tensor {
    let taps: [f32; 9] = [-1.0, 0.0, 1.0, -2.0, 0.0, 2.0, -1.0, 0.0, 1.0];
    Tensor::of_slice(&taps).view([1, 1, 3, 3]).to_device(device) / 8.0
}

fn sobel_kernel_y(device: Device) -> Tensor {
    sobel_kernel_x(device).transpose(2, 3)
}

fn conv2d_same(image: &Tensor, kernel: &Tensor) -> Tensor {
    let size = image.size();
    let (height, width) = (size[0], size[1]);
    image
        .view([1, 1, height, width])
        .conv2d(kernel, None::<Tensor>, &[1, 1], &[1, 1], &[1, 1], 1)
        .view([height, width])
}

/// One-pixel binary erosion of a `[H, W]` 0/1 mask.
fn erode(mask: &Tensor) -> Tensor {
    let size = mask.size();
    let (height, width) = (size[0], size[1]);

    let inverted = mask * -1.0 + 1.0;
    let grown = inverted
        .view([1, 1, height, width])
        .max_pool2d(&[3, 3], &[1, 1], &[1, 1], &[1, 1], false)
        .view([height, width]);
    grown * -1.0 + 1.0
}

fn border_mask(height: i64, width: i64, device: Device) -> Tensor {
    let mask = Tensor::zeros(&[height, width], (Kind::Float, device));
    let mut inner = mask.narrow(0, 1, height - 2).narrow(1, 1, width - 2);
    let _ = inner.fill_(1.0);
    mask
}

/// `out[y, x] = t[y + dy, x + dx]`, zero outside the image.
fn shift(t: &Tensor, dy: i64, dx: i64) -> Tensor {
    let size = t.size();
    let (height, width) = (size[0], size[1]);

    let padded = t.constant_pad_nd(&[(-dx).max(0), dx.max(0), (-dy).max(0), dy.max(0)]);
    padded
        .narrow(0, dy.max(0), height)
        .narrow(1, dx.max(0), width)
}

/// 1 where the pixel is a maximum against its two neighbors along (dy, dx).
fn local_max(magnitude: &Tensor, dy: i64, dx: i64) -> Tensor {
    let fore = shift(magnitude, dy, dx);
    let back = shift(magnitude, -dy, -dx);
    let ge_fore = (magnitude - fore).ge(0.0).to_kind(Kind::Float);
    let ge_back = (magnitude - back).ge(0.0).to_kind(Kind::Float);
    ge_fore * ge_back
}

fn sector_mask(angle: &Tensor, lo: f64, hi: f64) -> Tensor {
    angle
        .ge(lo)
        .logical_and(&angle.lt(hi))
        .to_kind(Kind::Float)
}

/// Thin ridges by suppressing non-maximal pixels along the gradient,
/// quantized into four direction sectors.
fn non_max_suppression(magnitude: &Tensor, gx: &Tensor, gy: &Tensor) -> Tensor {
    let angle = gy.atan2(gx).rad2deg().remainder(180.0);

    let horizontal = sector_mask(&angle, 0.0, 22.5) + sector_mask(&angle, 157.5, 180.0);
    let diag_main = sector_mask(&angle, 22.5, 67.5);
    let vertical = sector_mask(&angle, 67.5, 112.5);
    let diag_anti = sector_mask(&angle, 112.5, 157.5);

    let keep = horizontal * local_max(magnitude, 0, 1)
        + diag_main * local_max(magnitude, 1, 1)
        + vertical * local_max(magnitude, 1, 0)
        + diag_anti * local_max(magnitude, 1, -1);

    magnitude * keep
}

/// Double threshold, then grow strong edges through connected weak pixels to
/// a fixed point.
fn hysteresis(magnitude: &Tensor) -> Tensor {
    let size = magnitude.size();
    let (height, width) = (size[0], size[1]);

    let weak = magnitude.gt(LOW_THRESHOLD).to_kind(Kind::Float);
    let mut edges = magnitude.gt(HIGH_THRESHOLD).to_kind(Kind::Float);

    loop {
        let grown = edges
            .view([1, 1, height, width])
            .max_pool2d(&[3, 3], &[1, 1], &[1, 1], &[1, 1], false)
            .view([height, width]);
        let next = grown * &weak;

        if f64::from((&next - &edges).abs().sum(Kind::Float)) == 0.0 {
            return next;
        }
        edges = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_image(height: i64, width: i64) -> Tensor {
        let image = Tensor::zeros(&[height, width], (Kind::Float, Device::Cpu));
        let mut right = image.narrow(1, width / 2, width - width / 2);
        let _ = right.fill_(1.0);
        image
    }

    #[test]
    fn flat_image_has_no_edges() {
        let image = Tensor::ones(&[64, 64], (Kind::Float, Device::Cpu));
        let edges = canny(&image, 2.0, None).unwrap();
        assert_eq!(f64::from(edges.sum(Kind::Float)), 0.0);
    }

    #[test]
    fn vertical_step_yields_vertical_edge() {
        let image = step_image(64, 64);
        let edges = canny(&image, 1.0, None).unwrap();

        assert!(f64::from(edges.sum(Kind::Float)) > 0.0);

        // the edge hugs the step, not the borders
        let far_left = edges.narrow(1, 0, 16);
        let far_right = edges.narrow(1, 48, 16);
        assert_eq!(f64::from(far_left.sum(Kind::Float)), 0.0);
        assert_eq!(f64::from(far_right.sum(Kind::Float)), 0.0);
    }

    #[test]
    fn detection_mask_suppresses_edges() {
        let image = step_image(64, 64);
        // the mask blanks out the step region entirely
        let mask = Tensor::ones(&[64, 64], (Kind::Float, Device::Cpu));
        let mut center = mask.narrow(1, 16, 32);
        let _ = center.fill_(0.0);

        let edges = canny(&image, 1.0, Some(&mask)).unwrap();
        assert_eq!(f64::from(edges.sum(Kind::Float)), 0.0);
    }

    #[test]
    fn rejects_bad_inputs() {
        let image = Tensor::zeros(&[8, 8], (Kind::Float, Device::Cpu));
        assert!(canny(&image, 0.0, None).is_err());
        let tiny = Tensor::zeros(&[2, 2], (Kind::Float, Device::Cpu));
        assert!(canny(&tiny, 1.0, None).is_err());
    }
}
