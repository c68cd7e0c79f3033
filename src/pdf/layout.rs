//! Word wrapping and shrink-to-fit sizing of text inside a box.

/// Sizing parameters shared by both layout strategies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    /// Smallest font size tried; text that still overflows is written at this size
    pub min_font_size: f32,
    /// Subtracted from the box height to get the starting font size
    pub box_margin: f32,
    /// Line advance as a multiple of the font size
    pub line_height: f32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            min_font_size: 5.0,
            box_margin: 1.0,
            line_height: 1.2,
        }
    }
}

/// Text wrapped into a box at a chosen size
#[derive(Debug, Clone, PartialEq)]
pub struct FittedText {
    pub size: f32,
    /// Lines in logical order
    pub lines: Vec<String>,
    /// True when even the smallest size did not fit
    pub overflow: bool,
}

impl FittedText {
    pub fn height(&self, line_height: f32) -> f32 {
        self.lines.len() as f32 * self.size * line_height
    }
}

/// Greedy word wrap. Explicit newlines always break; a word wider than the
/// box gets a line of its own.
pub fn wrap_text(text: &str, max_width: f32, measure: &dyn Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }
            let candidate = format!("{} {}", current, word);
            if measure(&candidate) <= max_width {
                current = candidate;
            } else {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    lines
}

/// Find the largest size, starting at the box height minus the margin and
/// going down 1pt at a time, at which the wrapped text fits both
/// dimensions. At the floor the text is accepted even if it overflows.
///
/// `measure(text, size)` returns the width of `text` at `size`.
pub fn fit_text(
    text: &str,
    width: f32,
    height: f32,
    options: &LayoutOptions,
    measure: &dyn Fn(&str, f32) -> f32,
) -> FittedText {
    let floor = options.min_font_size.max(0.1);
    let mut size = (height - options.box_margin).floor().max(floor);

    loop {
        let lines = wrap_text(text, width, &|line| measure(line, size));
        let fits_height = lines.len() as f32 * size * options.line_height <= height
            || (lines.len() <= 1 && size <= height);
        let fits_width = lines.iter().all(|line| measure(line, size) <= width);
        if fits_height && fits_width {
            return FittedText {
                size,
                lines,
                overflow: false,
            };
        }
        if size - 1.0 < floor {
            return FittedText {
                size: floor,
                lines: if size == floor {
                    lines
                } else {
                    wrap_text(text, width, &|line| measure(line, floor))
                },
                overflow: true,
            };
        }
        size -= 1.0;
    }
}
