//! Sound cues
//!
//! The simulation and quiz logic only queue `Cue`s; the front-end drains
//! them once per frame. On the web they are synthesized with the Web Audio
//! API, no sound files needed.

/// Sound cue types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Jump,
    Coin,
    Correct,
    Wrong,
    /// Gate opened
    Gate,
    /// Countdown tick in the last seconds of a redeem question
    Tick,
    Fail,
    Button,
}

#[cfg(target_arch = "wasm32")]
pub use web::AudioManager;

#[cfg(target_arch = "wasm32")]
mod web {
    use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

    use super::Cue;

    /// Audio manager for the game
    pub struct AudioManager {
        ctx: Option<AudioContext>,
        volume: f32,
    }

    impl AudioManager {
        pub fn new(volume: f32) -> Self {
            // May fail outside a secure context
            let ctx = AudioContext::new().ok();
            if ctx.is_none() {
                log::warn!("Failed to create AudioContext - audio disabled");
            }
            Self { ctx, volume }
        }

        /// Resume audio context (required after user gesture)
        pub fn resume(&self) {
            if let Some(ctx) = &self.ctx {
                let _ = ctx.resume();
            }
        }

        pub fn set_volume(&mut self, volume: f32) {
            self.volume = volume.clamp(0.0, 1.0);
        }

        /// Play a cue. Never blocks, silently drops on any Web Audio error.
        pub fn play(&self, cue: Cue) {
            if self.volume <= 0.0 {
                return;
            }
            let Some(ctx) = &self.ctx else { return };
            if ctx.state() == web_sys::AudioContextState::Suspended {
                let _ = ctx.resume();
            }

            let vol = self.volume;
            match cue {
                Cue::Jump => self.beep(ctx, 300.0, 0.06, OscillatorType::Square, vol, 0.0),
                Cue::Coin => self.chirp(ctx, 900.0, 1400.0, 0.09, OscillatorType::Triangle, vol, 0.0),
                Cue::Correct => {
                    self.chirp(ctx, 600.0, 1200.0, 0.12, OscillatorType::Sine, vol, 0.0);
                    self.chirp(ctx, 800.0, 1600.0, 0.12, OscillatorType::Sine, vol, 0.1);
                }
                Cue::Wrong => self.beep(ctx, 140.0, 0.18, OscillatorType::Sawtooth, vol, 0.0),
                Cue::Gate => {
                    self.chirp(ctx, 500.0, 1500.0, 0.18, OscillatorType::Triangle, vol * 1.25, 0.0);
                    self.chirp(ctx, 750.0, 2000.0, 0.18, OscillatorType::Triangle, vol * 1.25, 0.14);
                }
                Cue::Tick => self.beep(ctx, 900.0, 0.05, OscillatorType::Square, vol * 0.75, 0.0),
                Cue::Fail => self.beep(ctx, 100.0, 0.3, OscillatorType::Sawtooth, vol, 0.0),
                Cue::Button => self.beep(ctx, 500.0, 0.05, OscillatorType::Square, vol * 0.6, 0.0),
            }
        }

        /// Create an oscillator with gain envelope
        fn create_osc(
            &self,
            ctx: &AudioContext,
            freq: f32,
            osc_type: OscillatorType,
        ) -> Option<(OscillatorNode, GainNode)> {
            let osc = ctx.create_oscillator().ok()?;
            let gain = ctx.create_gain().ok()?;

            osc.set_type(osc_type);
            osc.frequency().set_value(freq);
            osc.connect_with_audio_node(&gain).ok()?;
            gain.connect_with_audio_node(&ctx.destination()).ok()?;

            Some((osc, gain))
        }

        /// Fixed-pitch tone with a fast attack and exponential decay
        fn beep(
            &self,
            ctx: &AudioContext,
            freq: f32,
            dur: f64,
            osc_type: OscillatorType,
            vol: f32,
            delay: f64,
        ) {
            let Some((osc, gain)) = self.create_osc(ctx, freq, osc_type) else {
                return;
            };
            let t = ctx.current_time() + delay;

            gain.gain().set_value_at_time(0.0001, t).ok();
            gain.gain().exponential_ramp_to_value_at_time(vol, t + 0.01).ok();
            gain.gain().exponential_ramp_to_value_at_time(0.0001, t + dur).ok();

            osc.start_with_when(t).ok();
            osc.stop_with_when(t + dur + 0.02).ok();
        }

        /// Pitch sweep from `f0` to `f1`
        #[allow(clippy::too_many_arguments)]
        fn chirp(
            &self,
            ctx: &AudioContext,
            f0: f32,
            f1: f32,
            dur: f64,
            osc_type: OscillatorType,
            vol: f32,
            delay: f64,
        ) {
            let Some((osc, gain)) = self.create_osc(ctx, f0, osc_type) else {
                return;
            };
            let t = ctx.current_time() + delay;

            osc.frequency().set_value_at_time(f0.max(1.0), t).ok();
            osc.frequency().exponential_ramp_to_value_at_time(f1.max(1.0), t + dur).ok();
            gain.gain().set_value_at_time(0.0001, t).ok();
            gain.gain().exponential_ramp_to_value_at_time(vol, t + 0.01).ok();
            gain.gain().exponential_ramp_to_value_at_time(0.0001, t + dur).ok();

            osc.start_with_when(t).ok();
            osc.stop_with_when(t + dur + 0.02).ok();
        }
    }
}
