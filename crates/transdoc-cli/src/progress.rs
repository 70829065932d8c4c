use indicatif::{ProgressBar, ProgressStyle};

use transdoc_core::ProgressView;

/// Percent-based bar for a running translation task.
pub fn task_bar(task_id: &str) -> ProgressBar {
    let pb = ProgressBar::new(100);
    let style = ProgressStyle::with_template(
        "{spinner:.green} {prefix} [{bar:40.cyan/blue}] {pos:>3}% {msg}",
    )
    .map(|s| s.progress_chars("#>-"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_prefix(task_id.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    pb
}

/// Mirror a tracker update onto the bar.
pub fn update(pb: &ProgressBar, view: &ProgressView) {
    pb.set_position(u64::from(view.percent()));
    match &view.error {
        Some(error) => pb.set_message(format!("{} ({error})", view.status_label())),
        None => pb.set_message(view.status_label().to_string()),
    }
}
