//! Progress arithmetic.

/// Auto-progress for a project: `round(100 * completed / total)`, 0 with no tasks.
///
/// Rounds half up, so 1 of 8 tasks done reads as 13.
pub fn auto_progress(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total) as u64;
    let total = total as u64;
    ((200 * completed + total) / (2 * total)) as u8
}

/// Round and clamp a client-supplied progress value into `0..=100`.
pub fn clamp_progress(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn no_tasks_is_zero() {
        assert_eq!(auto_progress(0, 0), 0);
    }

    #[test]
    fn rounds_half_up() {
        assert_eq!(auto_progress(1, 2), 50);
        assert_eq!(auto_progress(1, 3), 33);
        assert_eq!(auto_progress(2, 3), 67);
        assert_eq!(auto_progress(1, 8), 13);
        assert_eq!(auto_progress(4, 4), 100);
    }

    #[test]
    fn clamps_out_of_range_values() {
        assert_eq!(clamp_progress(-12.0), 0);
        assert_eq!(clamp_progress(140.0), 100);
        assert_eq!(clamp_progress(49.5), 50);
        assert_eq!(clamp_progress(f64::NAN), 0);
    }
}
