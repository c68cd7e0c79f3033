//! Right-to-left text preparation.
//!
//! Two paths exist. The plain path substitutes Arabic presentation forms
//! for contextual joining and then reorders each line visually with the
//! Unicode bidirectional algorithm, so any font that has the presentation
//! form glyphs renders it correctly with a simple `Tj`. The shaped path runs
//! each visual bidi run through `rustybuzz` against the embedded font.

use rustybuzz::{Face, UnicodeBuffer};
use std::fmt;
use unicode_bidi::{BidiInfo, Level};

/// Writing direction of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

impl Direction {
    pub fn is_rtl(&self) -> bool {
        matches!(self, Self::Rtl)
    }

    fn level(&self) -> Level {
        match self {
            Self::Ltr => Level::ltr(),
            Self::Rtl => Level::rtl(),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ltr => write!(f, "ltr"),
            Self::Rtl => write!(f, "rtl"),
        }
    }
}

/// Joining behaviour of a letter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Joining {
    /// Joins on both sides: isolated, final, initial, medial forms
    Dual([char; 4]),
    /// Joins to the preceding letter only: isolated, final forms
    Right([char; 2]),
    /// Never joins
    None,
    /// Tatweel: joins both sides and has no forms
    Causing,
}

fn dual(iso: u32) -> Joining {
    let form = |offset: u32| char::from_u32(iso + offset).unwrap_or('\u{FFFD}');
    Joining::Dual([form(0), form(1), form(2), form(3)])
}

fn right(iso: u32) -> Joining {
    let form = |offset: u32| char::from_u32(iso + offset).unwrap_or('\u{FFFD}');
    Joining::Right([form(0), form(1)])
}

fn joining(c: char) -> Option<Joining> {
    let joining = match c {
        '\u{0621}' => Joining::None,
        '\u{0622}' => right(0xFE81),
        '\u{0623}' => right(0xFE83),
        '\u{0624}' => right(0xFE85),
        '\u{0625}' => right(0xFE87),
        '\u{0626}' => dual(0xFE89),
        '\u{0627}' => right(0xFE8D),
        '\u{0628}' => dual(0xFE8F),
        '\u{0629}' => right(0xFE93),
        '\u{062A}' => dual(0xFE95),
        '\u{062B}' => dual(0xFE99),
        '\u{062C}' => dual(0xFE9D),
        '\u{062D}' => dual(0xFEA1),
        '\u{062E}' => dual(0xFEA5),
        '\u{062F}' => right(0xFEA9),
        '\u{0630}' => right(0xFEAB),
        '\u{0631}' => right(0xFEAD),
        '\u{0632}' => right(0xFEAF),
        '\u{0633}' => dual(0xFEB1),
        '\u{0634}' => dual(0xFEB5),
        '\u{0635}' => dual(0xFEB9),
        '\u{0636}' => dual(0xFEBD),
        '\u{0637}' => dual(0xFEC1),
        '\u{0638}' => dual(0xFEC5),
        '\u{0639}' => dual(0xFEC9),
        '\u{063A}' => dual(0xFECD),
        '\u{0640}' => Joining::Causing,
        '\u{0641}' => dual(0xFED1),
        '\u{0642}' => dual(0xFED5),
        '\u{0643}' => dual(0xFED9),
        '\u{0644}' => dual(0xFEDD),
        '\u{0645}' => dual(0xFEE1),
        '\u{0646}' => dual(0xFEE5),
        '\u{0647}' => dual(0xFEE9),
        '\u{0648}' => right(0xFEED),
        '\u{0649}' => right(0xFEEF),
        '\u{064A}' => dual(0xFEF1),
        // Persian letters
        '\u{067E}' => dual(0xFB56),
        '\u{0686}' => dual(0xFB7A),
        '\u{0698}' => right(0xFB8A),
        '\u{06A9}' => dual(0xFB8E),
        '\u{06AF}' => dual(0xFB92),
        '\u{06CC}' => dual(0xFBFC),
        _ => return None,
    };
    Some(joining)
}

/// Harakat and other marks that do not break joining
fn is_transparent(c: char) -> bool {
    matches!(c, '\u{064B}'..='\u{065F}' | '\u{0670}' | '\u{06D6}'..='\u{06ED}')
}

/// Lam-alef ligature (isolated, final) for the alef following a lam
fn lam_alef(alef: char) -> Option<[char; 2]> {
    match alef {
        '\u{0622}' => Some(['\u{FEF5}', '\u{FEF6}']),
        '\u{0623}' => Some(['\u{FEF7}', '\u{FEF8}']),
        '\u{0625}' => Some(['\u{FEF9}', '\u{FEFA}']),
        '\u{0627}' => Some(['\u{FEFB}', '\u{FEFC}']),
        _ => None,
    }
}

fn joins_forward(j: Joining) -> bool {
    matches!(j, Joining::Dual(_) | Joining::Causing)
}

fn joins_backward(j: Joining) -> bool {
    matches!(j, Joining::Dual(_) | Joining::Right(_) | Joining::Causing)
}

/// Replace Arabic letters with their contextual presentation forms, in
/// logical order
pub fn join_arabic(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let neighbour = |from: usize, forward: bool| -> Option<(usize, Joining)> {
        let mut i = from;
        loop {
            if forward {
                i += 1;
                if i >= chars.len() {
                    return None;
                }
            } else {
                if i == 0 {
                    return None;
                }
                i -= 1;
            }
            if is_transparent(chars[i]) {
                continue;
            }
            return joining(chars[i]).map(|j| (i, j));
        }
    };

    let mut output = String::with_capacity(text.len());
    let mut skip = None;
    for (i, &c) in chars.iter().enumerate() {
        if skip == Some(i) {
            continue;
        }
        let Some(current) = joining(c) else {
            output.push(c);
            continue;
        };
        let joined_before = neighbour(i, false).is_some_and(|(_, prev)| joins_forward(prev));

        if c == '\u{0644}' {
            if let Some((next_index, ligature)) =
                neighbour(i, true).and_then(|(n, _)| lam_alef(chars[n]).map(|l| (n, l)))
            {
                output.push(if joined_before { ligature[1] } else { ligature[0] });
                // marks between lam and alef are kept after the ligature
                for &mark in &chars[i + 1..next_index] {
                    output.push(mark);
                }
                skip = Some(next_index);
                continue;
            }
        }

        let joined_after = joins_forward(current)
            && neighbour(i, true).is_some_and(|(_, next)| joins_backward(next));
        let shaped = match current {
            Joining::Dual(forms) => match (joined_before, joined_after) {
                (false, false) => forms[0],
                (true, false) => forms[1],
                (false, true) => forms[2],
                (true, true) => forms[3],
            },
            Joining::Right(forms) => {
                if joined_before {
                    forms[1]
                } else {
                    forms[0]
                }
            }
            Joining::None | Joining::Causing => c,
        };
        output.push(shaped);
    }
    output
}

/// Reorder one logical line into visual (left to right) order
pub fn visual_order(line: &str, base: Direction) -> String {
    if line.is_empty() {
        return String::new();
    }
    let bidi = BidiInfo::new(line, Some(base.level()));
    let mut visual = String::with_capacity(line.len());
    for paragraph in &bidi.paragraphs {
        visual.push_str(&bidi.reorder_line(paragraph, paragraph.range.clone()));
    }
    visual
}

/// One glyph produced by shaping
#[derive(Debug, Clone, PartialEq)]
pub struct ShapedGlyph {
    pub glyph_id: u16,
    /// Advance in font units
    pub x_advance: i32,
    /// Text of the cluster this glyph starts, empty for the following glyphs
    pub text: String,
}

/// Shape a logical line into glyphs in visual order.
///
/// The line is split into bidi runs; each run is shaped with its own
/// direction and the runs are laid out in visual order.
pub fn shape_line(face: &Face<'_>, line: &str, base: Direction) -> Vec<ShapedGlyph> {
    if line.is_empty() {
        return Vec::new();
    }
    let bidi = BidiInfo::new(line, Some(base.level()));
    let mut glyphs = Vec::new();
    for paragraph in &bidi.paragraphs {
        let (levels, runs) = bidi.visual_runs(paragraph, paragraph.range.clone());
        for run in runs {
            let rtl = levels[run.start].is_rtl();
            glyphs.extend(shape_run(face, &line[run.clone()], rtl));
        }
    }
    glyphs
}

/// Shape one single-direction run; output is in visual order
pub fn shape_run(face: &Face<'_>, text: &str, rtl: bool) -> Vec<ShapedGlyph> {
    let mut buffer = UnicodeBuffer::new();
    buffer.push_str(text);
    buffer.set_direction(if rtl {
        rustybuzz::Direction::RightToLeft
    } else {
        rustybuzz::Direction::LeftToRight
    });
    buffer.guess_segment_properties();
    let output = rustybuzz::shape(face, &[], buffer);

    let infos = output.glyph_infos();
    let positions = output.glyph_positions();
    let mut glyphs = Vec::with_capacity(infos.len());
    let mut seen_clusters = std::collections::HashSet::new();

    for (info, position) in infos.iter().zip(positions) {
        let cluster = info.cluster as usize;
        let cluster_text = if seen_clusters.insert(cluster) {
            cluster_slice(text, cluster, infos.iter().map(|i| i.cluster as usize))
        } else {
            String::new()
        };
        glyphs.push(ShapedGlyph {
            glyph_id: info.glyph_id as u16,
            x_advance: position.x_advance,
            text: cluster_text,
        });
    }
    glyphs
}

/// Text from a cluster start up to the next larger cluster start
fn cluster_slice(text: &str, start: usize, clusters: impl Iterator<Item = usize>) -> String {
    let end = clusters.filter(|c| *c > start).min().unwrap_or(text.len());
    text.get(start..end).unwrap_or_default().to_string()
}

/// Advance of shaped glyphs in text space units at `size`
pub fn shaped_width(glyphs: &[ShapedGlyph], units_per_em: f32, size: f32) -> f32 {
    glyphs.iter().map(|g| g.x_advance as f32).sum::<f32>() / units_per_em.max(1.0) * size
}
