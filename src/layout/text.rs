use crate::config::LayoutConfig;

const LINE_HEIGHT: f32 = 1.5;

/// Approximate advance of `ch` at 1px font size for a sans-serif stack.
fn char_width_factor(ch: char) -> f32 {
    match ch {
        ' ' | 't' | 'f' | 'r' => 0.33,
        'i' | 'j' | 'l' | 'I' | '.' | ',' | ':' | ';' | '!' | '|' | '\'' => 0.25,
        '(' | ')' | '[' | ']' | '{' | '}' => 0.32,
        'm' | 'w' | 'M' | 'W' => 0.88,
        '@' | '#' | '%' | '&' => 0.95,
        'A'..='Z' => 0.66,
        '0'..='9' => 0.6,
        c if c.is_ascii() => 0.56,
        // CJK and other full-width glyphs.
        _ => 1.0,
    }
}

pub(super) fn text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(char_width_factor).sum::<f32>() * font_size
}

/// Box a node is laid out with. Fixed unless `fit_labels` is on, in which case
/// the box grows to hold its widest line and all of its lines.
pub(super) fn node_size(label: &str, config: &LayoutConfig) -> (f32, f32) {
    if !config.fit_labels {
        return (config.node_width, config.node_height);
    }
    let lines: Vec<&str> = label.split('\n').map(str::trim).collect();
    let widest = lines
        .iter()
        .map(|line| text_width(line, config.label_font_size))
        .fold(0.0, f32::max);
    let text_height = lines.len().max(1) as f32 * config.label_font_size * LINE_HEIGHT;
    let width = (widest + config.label_padding_x * 2.0).max(config.node_width);
    let height = (text_height + config.label_padding_x).max(config.node_height);
    (width, height)
}
