use super::Mask;
use crate::config::TemplateConfig;
use image::Luma;

/// One step of the refinement chain. `None` means the step could not
/// produce an output.
pub type MaskFilter<'a> = &'a dyn Fn(&Mask) -> Option<Mask>;

/// Scale mask values by `2^ev`. Values are not clamped so later steps see
/// the extended range.
pub fn exposure(mask: &Mask, ev: f32) -> Option<Mask> {
    let gain = 2f32.powf(ev);
    map_values(mask, |v| v * gain)
}

/// Stretch mask values away from mid-gray by `amount` (1.0 = unchanged).
pub fn contrast(mask: &Mask, amount: f32) -> Option<Mask> {
    map_values(mask, |v| (v - 0.5) * amount + 0.5)
}

/// Pin white to reference white: values inside [0, 1] keep their level,
/// anything pushed past either end by earlier steps is clamped.
///
/// Dim masks are not stretched, so a frame with no confident subject
/// stays mostly background.
pub fn white_point(mask: &Mask) -> Option<Mask> {
    map_values(mask, |v| v.clamp(0.0, 1.0))
}

fn map_values(mask: &Mask, f: impl Fn(f32) -> f32) -> Option<Mask> {
    if mask.width() == 0 || mask.height() == 0 {
        return None;
    }
    let mut out = Mask::new(mask.width(), mask.height());
    for (dst, src) in out.pixels_mut().zip(mask.pixels()) {
        let value = f(src[0]);
        if !value.is_finite() {
            return None;
        }
        *dst = Luma([value]);
    }
    Some(out)
}

/// Run `filters` in order. If any step fails, the input mask is returned
/// untouched.
pub fn refine_mask(mask: Mask, filters: &[MaskFilter<'_>]) -> Mask {
    let mut current: Option<Mask> = None;
    for (step, filter) in filters.iter().enumerate() {
        let input = current.as_ref().unwrap_or(&mask);
        match filter(input) {
            Some(next) => current = Some(next),
            None => {
                tracing::debug!("Mask refinement step {} produced no output, keeping raw mask", step);
                return mask;
            }
        }
    }
    current.unwrap_or(mask)
}

/// Exposure, contrast and white-point adjustment that push soft model
/// edges toward a binary mask.
#[derive(Debug, Clone, Copy)]
pub struct MaskRefiner {
    exposure_ev: f32,
    contrast: f32,
}

impl MaskRefiner {
    pub fn new(exposure_ev: f32, contrast: f32) -> Self {
        Self {
            exposure_ev,
            contrast,
        }
    }

    pub fn from_config(config: &TemplateConfig) -> Self {
        Self::new(config.mask_exposure_ev, config.mask_contrast)
    }

    pub fn refine(&self, mask: Mask) -> Mask {
        let _span = tracing::debug_span!("refine_mask").entered();

        let ev = self.exposure_ev;
        let amount = self.contrast;
        refine_mask(
            mask,
            &[
                &|m: &Mask| exposure(m, ev),
                &|m: &Mask| contrast(m, amount),
                &white_point,
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask(values: &[f32]) -> Mask {
        Mask::from_raw(values.len() as u32, 1, values.to_vec()).unwrap()
    }

    #[test]
    fn exposure_doubles_per_stop() {
        let out = exposure(&mask(&[0.25, 0.5]), 1.0).unwrap();
        assert_eq!(out.into_raw(), vec![0.5, 1.0]);
    }

    #[test]
    fn contrast_pivots_on_mid_gray() {
        let out = contrast(&mask(&[0.5, 0.75, 0.25]), 2.0).unwrap();
        assert_eq!(out.into_raw(), vec![0.5, 1.0, 0.0]);
    }

    #[test]
    fn white_point_clamps_without_stretching() {
        let out = white_point(&mask(&[0.0, 0.25, 0.5])).unwrap();
        assert_eq!(out.into_raw(), vec![0.0, 0.25, 0.5]);

        let out = white_point(&mask(&[-0.3, 0.4, 1.7])).unwrap();
        assert_eq!(out.into_raw(), vec![0.0, 0.4, 1.0]);
    }

    #[test]
    fn uniformly_dim_mask_stays_dim() {
        // 0.2 -> 0.4 after +1 EV -> 0.35 after contrast 1.5.
        let refined = MaskRefiner::new(1.0, 1.5).refine(mask(&[0.2, 0.2, 0.2])).into_raw();
        for value in refined {
            assert!((value - 0.35).abs() < 1e-6, "got {value}");
        }
    }

    #[test]
    fn empty_mask_fails_white_point() {
        assert!(white_point(&Mask::new(0, 0)).is_none());
    }

    #[test]
    fn refinement_pushes_soft_edges_toward_binary() {
        let raw = mask(&[0.05, 0.3, 0.5, 0.9]);
        let refined = MaskRefiner::new(1.0, 1.5).refine(raw).into_raw();

        assert!(refined.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(refined.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(refined[0], 0.0);
        assert_eq!(refined[2], 1.0);
        assert_eq!(refined[3], 1.0);
    }

    #[test]
    fn failing_step_returns_raw_mask() {
        let raw = mask(&[0.1, 0.6]);
        let fail = |_: &Mask| -> Option<Mask> { None };
        let out = refine_mask(raw.clone(), &[&|m: &Mask| exposure(m, 1.0), &fail]);
        assert_eq!(out, raw);
    }

    #[test]
    fn black_mask_survives_refinement_unchanged() {
        let raw = mask(&[0.0, 0.0, 0.0]);
        assert_eq!(MaskRefiner::new(1.0, 1.5).refine(raw.clone()), raw);
    }
}
