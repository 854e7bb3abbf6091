use comet_sim::{InputSource, PlayerRef, ShipInput};

/// Scripted pilot for headless runs: thrusts in bursts and banks left
/// now and then. Each player is phase-shifted so ships spread out.
#[derive(Debug, Clone, Copy)]
pub struct Autopilot {
    /// Frames per thrust cycle.
    pub period: u64,
}

impl Default for Autopilot {
    fn default() -> Self {
        Self { period: 120 }
    }
}

impl InputSource for Autopilot {
    fn poll(&self, player: PlayerRef, frame: u64) -> ShipInput {
        let period = self.period.max(2);
        let phase = (frame + u64::from(player.0) * 17) % period;
        ShipInput {
            accelerate: phase < period / 2,
            turn_left: phase % 30 < 6,
            turn_right: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thrusts_for_half_the_cycle() {
        let pilot = Autopilot { period: 10 };
        let thrusting = (0..10)
            .filter(|&f| pilot.poll(PlayerRef(0), f).accelerate)
            .count();
        assert_eq!(thrusting, 5);
    }

    #[test]
    fn test_players_are_out_of_phase() {
        let pilot = Autopilot::default();
        let a: Vec<_> = (0..60).map(|f| pilot.poll(PlayerRef(0), f)).collect();
        let b: Vec<_> = (0..60).map(|f| pilot.poll(PlayerRef(1), f)).collect();
        assert_ne!(a, b);
    }

    #[test]
    fn test_zero_period_does_not_panic() {
        let pilot = Autopilot { period: 0 };
        let _ = pilot.poll(PlayerRef(3), 7);
    }
}
