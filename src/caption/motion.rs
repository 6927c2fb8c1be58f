//! Per-letter motion curves for animated caption reveal
//!
//! A curve captures a letter's resting position and its place in the reveal
//! order, and maps elapsed time (seconds since the caption appeared) to a
//! screen position. Letters are staggered by `index * step`; `step` is
//! normally `1 / letter_count` so the whole caption lands within one
//! transition.
//!
//! Every curve renders both ways: [`MotionCurve::position_at`] evaluates it
//! directly, and [`MotionCurve::x_expr`] / [`MotionCurve::y_expr`] emit the
//! same formula as an ffmpeg expression in `t` for the drawtext filter.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::CaptionError;

/// Pixel distance letters travel with `arrive` and `cascade`
pub const TRAVEL: f64 = 400.0;

/// Horizontal offset that parks a not-yet-typed letter off screen
pub const TYPING_HIDDEN_OFFSET: f64 = 1e20;

const MIN_TRANSITION: f64 = 1e-6;

/// Screen position in pixels (origin top-left)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Named per-letter animation style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LetterEffect {
    /// Whole lines, no per-letter animation
    #[default]
    None,
    /// Letters pop in one after another
    Typing,
    /// Letters slide in from the right
    Arrive,
    /// Letters drop in and settle with a damped bounce
    Cascade,
}

impl LetterEffect {
    /// Whether captions are split into one overlay per letter
    #[must_use]
    pub fn is_per_letter(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Reveal step that spreads `letter_count` letters over one time unit
    #[must_use]
    pub fn step_for(letter_count: usize) -> f64 {
        1.0 / letter_count.max(1) as f64
    }

    /// Build the curve for one letter, or `None` for static captions.
    #[must_use]
    pub fn curve(
        self,
        origin: Position,
        index: usize,
        step: f64,
        transition: f64,
    ) -> Option<MotionCurve> {
        let params = CurveParams::new(origin, index, step, transition);
        match self {
            Self::None => None,
            Self::Typing => Some(MotionCurve::Typing(params)),
            Self::Arrive => Some(MotionCurve::Arrive(params)),
            Self::Cascade => Some(MotionCurve::Cascade(params)),
        }
    }
}

impl fmt::Display for LetterEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Typing => "typing",
            Self::Arrive => "arrive",
            Self::Cascade => "cascade",
        };
        f.write_str(name)
    }
}

impl FromStr for LetterEffect {
    type Err = CaptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "typing" => Ok(Self::Typing),
            "arrive" => Ok(Self::Arrive),
            "cascade" => Ok(Self::Cascade),
            other => Err(CaptionError::UnsupportedEffect(other.to_string())),
        }
    }
}

/// Parameters shared by every curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveParams {
    pub origin: Position,
    pub index: usize,
    pub step: f64,
    pub transition: f64,
}

impl CurveParams {
    #[must_use]
    pub fn new(origin: Position, index: usize, step: f64, transition: f64) -> Self {
        Self {
            origin,
            index,
            step,
            transition: transition.max(MIN_TRANSITION),
        }
    }

    /// Time at which this letter starts moving
    #[must_use]
    pub fn delay(&self) -> f64 {
        self.step * self.index as f64
    }

    fn progress(&self, t: f64) -> f64 {
        (t - self.delay()) / self.transition
    }

    fn progress_expr(&self) -> String {
        format!("((t-{})/{})", num(self.delay()), num(self.transition))
    }
}

/// A letter's trajectory
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionCurve {
    /// Linear slide in from `3 * TRAVEL` px right of the origin
    Arrive(CurveParams),
    /// Hidden until the reveal time, then at the origin
    Typing(CurveParams),
    /// Vertical drop following a damped `sinc`
    Cascade(CurveParams),
}

impl MotionCurve {
    #[must_use]
    pub fn params(&self) -> &CurveParams {
        match self {
            Self::Arrive(p) | Self::Typing(p) | Self::Cascade(p) => p,
        }
    }

    /// Position `t` seconds after the caption appeared
    #[must_use]
    pub fn position_at(&self, t: f64) -> Position {
        match self {
            Self::Arrive(p) => {
                let offset = TRAVEL * (3.0 - 3.0 * p.progress(t)).max(0.0);
                Position::new(p.origin.x + offset, p.origin.y)
            }
            Self::Typing(p) => {
                let offset = if t < p.delay() { TYPING_HIDDEN_OFFSET } else { 0.0 };
                Position::new(p.origin.x + offset, p.origin.y)
            }
            Self::Cascade(p) => {
                let tau = p.progress(t);
                let factor = if tau < 0.0 {
                    1.0
                } else {
                    (sinc(tau) / (1.0 + tau.powi(4))).abs()
                };
                Position::new(p.origin.x, p.origin.y + TRAVEL * factor)
            }
        }
    }

    /// ffmpeg expression for the x coordinate
    #[must_use]
    pub fn x_expr(&self) -> String {
        match self {
            Self::Arrive(p) => format!(
                "{}+{}*max(0,3-3*{})",
                num(p.origin.x),
                num(TRAVEL),
                p.progress_expr()
            ),
            // drawtext cannot place text at 1e20 px; the hidden phase is the enable window
            Self::Typing(p) | Self::Cascade(p) => num(p.origin.x),
        }
    }

    /// ffmpeg expression for the y coordinate
    #[must_use]
    pub fn y_expr(&self) -> String {
        match self {
            Self::Arrive(p) | Self::Typing(p) => num(p.origin.y),
            Self::Cascade(p) => {
                let tau = p.progress_expr();
                let sinc = format!("if(eq({tau},0),1,sin(PI*{tau})/(PI*{tau}))");
                format!(
                    "{}+{}*if(lt({tau},0),1,abs({sinc}/(1+pow({tau},4))))",
                    num(p.origin.y),
                    num(TRAVEL),
                )
            }
        }
    }

    /// ffmpeg `enable` condition, when the letter must stay undrawn for a while
    #[must_use]
    pub fn enable_expr(&self) -> Option<String> {
        match self {
            Self::Typing(p) => Some(format!("gte(t,{})", num(p.delay()))),
            Self::Arrive(_) | Self::Cascade(_) => None,
        }
    }
}

/// Normalized sinc, `sin(πx) / (πx)`
fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        let px = std::f64::consts::PI * x;
        px.sin() / px
    }
}

/// Number literal for an ffmpeg expression; negatives are parenthesised.
fn num(value: f64) -> String {
    let rounded = (value * 1e6).round() / 1e6;
    if rounded < 0.0 {
        format!("({rounded})")
    } else {
        format!("{rounded}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn curve(effect: LetterEffect, index: usize, step: f64) -> MotionCurve {
        effect
            .curve(Position::new(100.0, 50.0), index, step, 1.0)
            .unwrap()
    }

    #[test]
    fn test_arrive_before_start() {
        let pos = curve(LetterEffect::Arrive, 2, 0.1).position_at(0.0);
        assert!(approx(pos.x, 1540.0), "x = {}", pos.x);
        assert_eq!(pos.y, 50.0);
    }

    #[test]
    fn test_arrive_settles_at_origin() {
        let c = curve(LetterEffect::Arrive, 2, 0.1);
        // 3 - 3 * (t - 0.2) reaches zero at t = 1.2
        assert!(approx(c.position_at(1.2).x, 100.0));
        assert!(approx(c.position_at(5.0).x, 100.0));
        assert!(approx(c.position_at(0.7).x, 100.0 + 400.0 * 1.5));
    }

    #[test]
    fn test_arrive_respects_transition_duration() {
        let c = LetterEffect::Arrive
            .curve(Position::new(0.0, 0.0), 0, 0.1, 2.0)
            .unwrap();
        assert!(approx(c.position_at(1.0).x, 400.0 * 1.5));
    }

    #[test]
    fn test_typing_hidden_until_reveal() {
        let c = curve(LetterEffect::Typing, 3, 0.25);
        let hidden = c.position_at(0.5);
        assert!(hidden.x >= 1e19);
        assert_eq!(hidden.y, 50.0);

        assert_eq!(c.position_at(0.75), Position::new(100.0, 50.0));
        assert_eq!(c.position_at(2.0), Position::new(100.0, 50.0));
    }

    #[test]
    fn test_cascade_offsets() {
        let c = curve(LetterEffect::Cascade, 1, 0.5);
        // before delay: full travel
        assert!(approx(c.position_at(0.0).y, 450.0));
        // tau = 0: sinc(0) = 1
        assert!(approx(c.position_at(0.5).y, 450.0));
        // tau = 1: sinc(1) = 0
        assert!(approx(c.position_at(1.5).y, 50.0));
        // tau = 0.5: (2 / PI) / 1.0625
        let expected = 50.0 + 400.0 * (2.0 / std::f64::consts::PI) / 1.0625;
        assert!(approx(c.position_at(1.0).y, expected));
        assert_eq!(c.position_at(1.0).x, 100.0);
    }

    #[test]
    fn test_cascade_overshoot_stays_below_rest() {
        let c = curve(LetterEffect::Cascade, 0, 0.1);
        for k in 0..200 {
            let pos = c.position_at(f64::from(k) * 0.05);
            assert!(pos.y >= 50.0 - 1e-9);
        }
    }

    #[test]
    fn test_none_effect_has_no_curve() {
        assert!(LetterEffect::None
            .curve(Position::default(), 0, 0.1, 1.0)
            .is_none());
        assert!(!LetterEffect::None.is_per_letter());
        assert!(LetterEffect::Cascade.is_per_letter());
    }

    #[test]
    fn test_step_for() {
        assert!(approx(LetterEffect::step_for(4), 0.25));
        assert!(approx(LetterEffect::step_for(0), 1.0));
    }

    #[test]
    fn test_effect_from_str() {
        assert_eq!("arrive".parse::<LetterEffect>().unwrap(), LetterEffect::Arrive);
        assert_eq!("none".parse::<LetterEffect>().unwrap(), LetterEffect::None);
        let err = "wobble".parse::<LetterEffect>().unwrap_err();
        assert!(err.to_string().contains("letter_effect wobble is not supported"));
    }

    #[test]
    fn test_effect_display_round_trips() {
        for effect in [
            LetterEffect::None,
            LetterEffect::Typing,
            LetterEffect::Arrive,
            LetterEffect::Cascade,
        ] {
            assert_eq!(effect.to_string().parse::<LetterEffect>().unwrap(), effect);
        }
    }

    #[test]
    fn test_arrive_expr() {
        let c = curve(LetterEffect::Arrive, 2, 0.1);
        assert_eq!(c.x_expr(), "100+400*max(0,3-3*((t-0.2)/1))");
        assert_eq!(c.y_expr(), "50");
        assert!(c.enable_expr().is_none());
    }

    #[test]
    fn test_typing_expr() {
        let c = curve(LetterEffect::Typing, 3, 0.25);
        assert_eq!(c.x_expr(), "100");
        assert_eq!(c.enable_expr().as_deref(), Some("gte(t,0.75)"));
    }

    #[test]
    fn test_cascade_expr() {
        let c = curve(LetterEffect::Cascade, 0, 0.5);
        let y = c.y_expr();
        assert!(y.starts_with("50+400*if(lt(((t-0)/1),0),1,abs("));
        assert!(y.contains("sin(PI*((t-0)/1))"));
        assert!(y.contains("pow(((t-0)/1),4)"));
        assert_eq!(c.x_expr(), "100");
    }

    #[test]
    fn test_negative_origin_is_parenthesised() {
        let c = LetterEffect::Arrive
            .curve(Position::new(-12.5, 3.0), 0, 0.1, 1.0)
            .unwrap();
        assert!(c.x_expr().starts_with("(-12.5)+400"));
    }
}
