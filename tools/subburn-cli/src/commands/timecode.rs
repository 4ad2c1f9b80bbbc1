//! Time code normalization.

use subburn_project_model::timecode::{format_srt_time, format_time, parse_time, try_parse_time};

pub fn run(values: Vec<String>) -> anyhow::Result<()> {
    for value in values {
        let secs = parse_time(&value);
        let note = if try_parse_time(&value).is_none() {
            "  (unreadable, treated as 0)"
        } else {
            ""
        };
        println!(
            "{value:>16} -> {} | {} | {secs:.3}s{note}",
            format_time(secs),
            format_srt_time(secs)
        );
    }
    Ok(())
}
