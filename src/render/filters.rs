use image::{imageops, Rgba, RgbaImage};

use crate::editor::{FilterOp, ShadowSpec};

const LUMA_R: f64 = 0.2126;
const LUMA_G: f64 = 0.7152;
const LUMA_B: f64 = 0.0722;
const MAX_SHADOW_PAD: u32 = 256;

type ColorMatrix = [[f64; 3]; 3];

/// Applies a composite filter to straight-alpha pixels. `scale` converts canvas pixels into
/// source pixels for blur radii.
pub fn apply_filters(image: &RgbaImage, ops: &[FilterOp], scale: f64) -> RgbaImage {
    let mut output = image.clone();
    for op in ops {
        match *op {
            FilterOp::Blur(radius) => {
                let sigma = capped_sigma(radius * scale, &output);
                if sigma > 0.0 {
                    output = blur_for_render(&output, sigma);
                }
            }
            FilterOp::Brightness(k) => map_channels(&mut output, |c| c * k),
            FilterOp::Contrast(k) => map_channels(&mut output, |c| (c - 0.5) * k + 0.5),
            FilterOp::Invert => map_channels(&mut output, |c| 1.0 - c),
            FilterOp::Saturate(s) => apply_matrix(&mut output, saturate_matrix(s)),
            FilterOp::HueRotate(deg) => apply_matrix(&mut output, hue_rotate_matrix(deg)),
            FilterOp::Sepia(amount) => apply_matrix(&mut output, sepia_matrix(amount)),
            FilterOp::Grayscale(amount) => apply_matrix(&mut output, grayscale_matrix(amount)),
        }
    }
    output
}

/// Shadow silhouette of `image`: the shadow color masked by source alpha, padded so the blur
/// can spread past the edges, then blurred. Returns the image and its padding in source pixels.
pub fn shadow_silhouette(image: &RgbaImage, shadow: &ShadowSpec, scale: f64) -> (RgbaImage, u32) {
    let sigma = capped_sigma(shadow.blur * scale / 2.0, image);
    let spread = shadow.blur * scale;
    let pad = if spread.is_finite() && spread > 0.0 {
        (spread.ceil().min(f64::from(MAX_SHADOW_PAD))) as u32
    } else {
        0
    };
    let color = shadow.color;
    let mut silhouette = RgbaImage::from_pixel(
        image.width() + pad * 2,
        image.height() + pad * 2,
        Rgba([color.r, color.g, color.b, 0]),
    );
    for (x, y, pixel) in image.enumerate_pixels() {
        let alpha = (u16::from(pixel[3]) * u16::from(color.a) / 255) as u8;
        silhouette.put_pixel(x + pad, y + pad, Rgba([color.r, color.g, color.b, alpha]));
    }
    if sigma > 0.0 {
        silhouette = blur_for_render(&silhouette, sigma);
    }
    (silhouette, pad)
}

/// Blur sigma in source pixels, never wider than the image diagonal. Past that point every
/// pixel already averages the whole image.
fn capped_sigma(radius: f64, image: &RgbaImage) -> f32 {
    if !radius.is_finite() || radius <= 0.0 {
        return 0.0;
    }
    let diagonal = f64::from(image.width()).hypot(f64::from(image.height())).max(1.0);
    radius.min(diagonal) as f32
}

fn blur_for_render(region: &RgbaImage, sigma: f32) -> RgbaImage {
    let width = region.width();
    let height = region.height();
    let downsample = blur_downsample_factor(sigma)
        .min(width.max(1))
        .min(height.max(1));
    if downsample <= 1 {
        return imageops::blur(region, sigma);
    }

    let reduced = imageops::resize(
        region,
        (width / downsample).max(1),
        (height / downsample).max(1),
        imageops::FilterType::Triangle,
    );
    let reduced_sigma = (sigma / downsample as f32).max(0.8);
    let blurred = imageops::blur(&reduced, reduced_sigma);
    imageops::resize(&blurred, width, height, imageops::FilterType::Triangle)
}

fn blur_downsample_factor(sigma: f32) -> u32 {
    match sigma {
        s if s >= 24.0 => 4,
        s if s >= 8.0 => 2,
        _ => 1,
    }
}

fn map_channels(image: &mut RgbaImage, f: impl Fn(f64) -> f64) {
    for pixel in image.pixels_mut() {
        for channel in pixel.0.iter_mut().take(3) {
            *channel = to_channel(f(f64::from(*channel) / 255.0));
        }
    }
}

fn apply_matrix(image: &mut RgbaImage, m: ColorMatrix) {
    for pixel in image.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let (r, g, b) = (
            f64::from(r) / 255.0,
            f64::from(g) / 255.0,
            f64::from(b) / 255.0,
        );
        pixel.0 = [
            to_channel(m[0][0] * r + m[0][1] * g + m[0][2] * b),
            to_channel(m[1][0] * r + m[1][1] * g + m[1][2] * b),
            to_channel(m[2][0] * r + m[2][1] * g + m[2][2] * b),
            a,
        ];
    }
}

fn to_channel(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn saturate_matrix(s: f64) -> ColorMatrix {
    [
        [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
    ]
}

fn hue_rotate_matrix(degrees: f64) -> ColorMatrix {
    let (sin, cos) = degrees.to_radians().sin_cos();
    [
        [
            0.213 + cos * 0.787 - sin * 0.213,
            0.715 - cos * 0.715 - sin * 0.715,
            0.072 - cos * 0.072 + sin * 0.928,
        ],
        [
            0.213 - cos * 0.213 + sin * 0.143,
            0.715 + cos * 0.285 + sin * 0.140,
            0.072 - cos * 0.072 - sin * 0.283,
        ],
        [
            0.213 - cos * 0.213 - sin * 0.787,
            0.715 - cos * 0.715 + sin * 0.715,
            0.072 + cos * 0.928 + sin * 0.072,
        ],
    ]
}

fn sepia_matrix(amount: f64) -> ColorMatrix {
    let k = 1.0 - amount.clamp(0.0, 1.0);
    [
        [0.393 + 0.607 * k, 0.769 - 0.769 * k, 0.189 - 0.189 * k],
        [0.349 - 0.349 * k, 0.686 + 0.314 * k, 0.168 - 0.168 * k],
        [0.272 - 0.272 * k, 0.534 - 0.534 * k, 0.131 + 0.869 * k],
    ]
}

fn grayscale_matrix(amount: f64) -> ColorMatrix {
    let k = 1.0 - amount.clamp(0.0, 1.0);
    [
        [LUMA_R + (1.0 - LUMA_R) * k, LUMA_G - LUMA_G * k, LUMA_B - LUMA_B * k],
        [LUMA_R - LUMA_R * k, LUMA_G + (1.0 - LUMA_G) * k, LUMA_B - LUMA_B * k],
        [LUMA_R - LUMA_R * k, LUMA_G - LUMA_G * k, LUMA_B + (1.0 - LUMA_B) * k],
    ]
}
