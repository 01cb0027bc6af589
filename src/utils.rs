/// `m:ss`, or `h:mm:ss` once an hour has passed. Used for the session clock.
pub fn format_clock(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

/// `1h 5m` / `42m`, for log listings.
pub fn format_duration(duration: chrono::Duration) -> String {
    let hours = duration.num_hours();
    let minutes = duration.num_minutes() % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

pub fn format_weight(weight: f64) -> String {
    if weight <= 0.0 {
        "bodyweight".to_owned()
    } else if weight.fract() == 0.0 {
        format!("{weight:.0}kg")
    } else {
        format!("{weight}kg")
    }
}
