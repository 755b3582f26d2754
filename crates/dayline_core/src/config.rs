use std::time::Duration;

/// Tunables for the scheduling and presentation engine. Values are read from
/// `DAYLINE_*` environment variables where present; anything missing or
/// unparsable keeps its default.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long an optimistic mutation stays cancellable.
    pub undo_window: Duration,
    /// Progress-sampling cadence for the undo countdown (UI smoothness only).
    pub undo_tick: Duration,
    /// Zoom bounds, in pixels per timeline minute.
    pub min_scale: f32,
    pub max_scale: f32,
    /// Timeline row height in pixels.
    pub row_height_px: f32,
    /// Narrowest rendered event width, so short events stay tappable.
    pub min_event_px: f32,
    /// Duration floor applied before layout, in minutes.
    pub min_event_minutes: u32,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(ms) = read_env_u64("DAYLINE_UNDO_WINDOW_MS") {
            if ms > 0 {
                config.undo_window = Duration::from_millis(ms);
            }
        }
        if let Some(ms) = read_env_u64("DAYLINE_UNDO_TICK_MS") {
            if ms > 0 {
                config.undo_tick = Duration::from_millis(ms);
            }
        }
        if let Some(scale) = read_env_f32("DAYLINE_MIN_SCALE") {
            if scale > 0.0 {
                config.min_scale = scale;
            }
        }
        if let Some(scale) = read_env_f32("DAYLINE_MAX_SCALE") {
            if scale >= config.min_scale {
                config.max_scale = scale;
            }
        }
        if let Some(minutes) = read_env_u64("DAYLINE_MIN_EVENT_MINUTES") {
            if minutes > 0 {
                config.min_event_minutes = minutes.min(1440) as u32;
            }
        }
        config
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            undo_window: Duration::from_millis(3000),
            undo_tick: Duration::from_millis(50),
            min_scale: 0.5,
            max_scale: 5.0,
            row_height_px: 48.0,
            min_event_px: 24.0,
            min_event_minutes: 15,
        }
    }
}

fn read_env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok()?.trim().parse::<u64>().ok()
}

fn read_env_f32(key: &str) -> Option<f32> {
    let value = std::env::var(key).ok()?.trim().parse::<f32>().ok()?;
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_product_settings() {
        let config = EngineConfig::default();
        assert_eq!(config.undo_window, Duration::from_millis(3000));
        assert_eq!(config.undo_tick, Duration::from_millis(50));
        assert_eq!(config.min_event_minutes, 15);
        assert!(config.min_scale < config.max_scale);
    }
}
