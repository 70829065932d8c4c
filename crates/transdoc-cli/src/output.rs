use owo_colors::OwoColorize;

use transdoc_core::{Block, BlockStatus, Settings};

/// Keep only the last four characters of a secret.
pub fn mask_key(key: &str) -> String {
    let count = key.chars().count();
    if count == 0 {
        return "(not set)".to_string();
    }
    if count <= 4 {
        return "****".to_string();
    }
    let tail: String = key.chars().skip(count - 4).collect();
    format!("****{tail}")
}

pub fn print_settings(settings: &Settings, color: bool) {
    let rows = [
        ("base_url", settings.base_url.clone()),
        ("api_key", mask_key(&settings.api_key)),
        ("model", settings.model.clone()),
    ];
    for (key, value) in rows {
        if color {
            println!("{} {value}", format!("{key:<10}").bold());
        } else {
            println!("{key:<10} {value}");
        }
    }
}

fn status_label(status: &BlockStatus, color: bool) -> String {
    let label = format!("{:<10}", status.label());
    if !color {
        return label;
    }
    match status {
        BlockStatus::Translated => label.green().to_string(),
        BlockStatus::Edited => label.yellow().to_string(),
        BlockStatus::Pending => label.dimmed().to_string(),
        BlockStatus::Other(_) => label,
    }
}

/// One line per block: order, id, status, then the source and its translation.
pub fn print_blocks(blocks: &[Block], color: bool) {
    for block in blocks {
        let header = format!("#{:<5} {:<12}", block.order_no, block.id.as_str());
        if color {
            println!("{} {}", header.bold(), status_label(&block.status, color));
        } else {
            println!("{header} {}", status_label(&block.status, color));
        }
        println!("    {}", block.source_text.replace('\n', "\n    "));
        if let Some(text) = &block.translated_text {
            if color {
                println!("    {}", text.replace('\n', "\n    ").cyan());
            } else {
                println!("    {}", text.replace('\n', "\n    "));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_all_but_tail() {
        assert_eq!(mask_key(""), "(not set)");
        assert_eq!(mask_key("abc"), "****");
        assert_eq!(mask_key("sk-1234567890"), "****7890");
    }

    #[test]
    fn plain_status_is_padded() {
        assert_eq!(status_label(&BlockStatus::Edited, false), "edited    ");
    }
}
