// Minimal SVG document builder and plot panels.

use std::fmt::Write;

pub const FONT: &str = "sans-serif";
const AXIS_COLOR: &str = "#333333";
const GRID_COLOR: &str = "#dddddd";
const Y_TICKS: usize = 5;

pub struct Svg {
    width: f64,
    height: f64,
    body: String,
}

impl Svg {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            body: String::new(),
        }
    }

    pub fn title(&mut self, text: &str) {
        self.text(self.width / 2.0, 28.0, text, Anchor::Middle, 18.0, true);
    }

    pub fn line(&mut self, (x1, y1): (f64, f64), (x2, y2): (f64, f64), color: &str, dashed: bool) {
        let dash = if dashed {
            r#" stroke-dasharray="6,4""#
        } else {
            ""
        };
        let _ = writeln!(
            self.body,
            r#"<line x1="{x1:.1}" y1="{y1:.1}" x2="{x2:.1}" y2="{y2:.1}" stroke="{color}" stroke-width="1.5"{dash}/>"#
        );
    }

    pub fn polyline(&mut self, points: &[(f64, f64)], color: &str) {
        let pts: Vec<String> = points
            .iter()
            .map(|(x, y)| format!("{x:.1},{y:.1}"))
            .collect();
        let _ = writeln!(
            self.body,
            r#"<polyline points="{}" fill="none" stroke="{color}" stroke-width="2"/>"#,
            pts.join(" ")
        );
    }

    pub fn circle(&mut self, (cx, cy): (f64, f64), r: f64, color: &str) {
        let _ = writeln!(
            self.body,
            r#"<circle cx="{cx:.1}" cy="{cy:.1}" r="{r:.1}" fill="{color}"/>"#
        );
    }

    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, fill: &str, opacity: f64) {
        let _ = writeln!(
            self.body,
            r#"<rect x="{x:.1}" y="{y:.1}" width="{:.1}" height="{:.1}" fill="{fill}" fill-opacity="{opacity:.2}" stroke="black" stroke-width="0.8"/>"#,
            w.max(0.0),
            h.max(0.0)
        );
    }

    pub fn text(&mut self, x: f64, y: f64, text: &str, anchor: Anchor, size: f64, bold: bool) {
        let weight = if bold { "bold" } else { "normal" };
        let _ = writeln!(
            self.body,
            r#"<text x="{x:.1}" y="{y:.1}" font-family="{FONT}" font-size="{size:.0}" font-weight="{weight}" text-anchor="{}">{}</text>"#,
            anchor.as_str(),
            escape(text)
        );
    }

    pub fn rotated_text(&mut self, x: f64, y: f64, text: &str, degrees: f64) {
        let _ = writeln!(
            self.body,
            r#"<text x="{x:.1}" y="{y:.1}" font-family="{FONT}" font-size="11" text-anchor="end" transform="rotate({degrees:.0} {x:.1} {y:.1})">{}</text>"#,
            escape(text)
        );
    }

    pub fn finish(self) -> String {
        format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w:.0}\" height=\"{h:.0}\" viewBox=\"0 0 {w:.0} {h:.0}\">\n\
             <rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n{body}</svg>\n",
            w = self.width,
            h = self.height,
            body = self.body
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

impl Anchor {
    fn as_str(self) -> &'static str {
        match self {
            Anchor::Start => "start",
            Anchor::Middle => "middle",
            Anchor::End => "end",
        }
    }
}

/// A rectangular plot area mapping data coordinates to pixels.
#[derive(Debug, Clone, Copy)]
pub struct Panel {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
}

impl Panel {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
            x_range: (0.0, 1.0),
            y_range: (0.0, 1.0),
        }
    }

    pub fn with_x(mut self, lo: f64, hi: f64) -> Self {
        self.x_range = widen(lo, hi);
        self
    }

    /// Y axis padded by 5% of the span so extreme points are not drawn on the frame.
    pub fn with_y(mut self, lo: f64, hi: f64) -> Self {
        let (lo, hi) = widen(lo, hi);
        let pad = (hi - lo) * 0.05;
        self.y_range = (lo - pad, hi + pad);
        self
    }

    pub fn x(&self, v: f64) -> f64 {
        let (lo, hi) = self.x_range;
        self.left + (v - lo) / (hi - lo) * self.width
    }

    pub fn y(&self, v: f64) -> f64 {
        let (lo, hi) = self.y_range;
        self.top + self.height - (v - lo) / (hi - lo) * self.height
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Frame, horizontal grid lines with value labels, panel title and y label.
    pub fn axes(&self, svg: &mut Svg, title: &str, y_label: &str) {
        let (lo, hi) = self.y_range;
        for i in 0..=Y_TICKS {
            let v = lo + (hi - lo) * i as f64 / Y_TICKS as f64;
            let y = self.y(v);
            svg.line((self.left, y), (self.left + self.width, y), GRID_COLOR, false);
            svg.text(self.left - 6.0, y + 4.0, &format!("{v:.1}"), Anchor::End, 11.0, false);
        }
        svg.line(
            (self.left, self.top),
            (self.left, self.bottom()),
            AXIS_COLOR,
            false,
        );
        svg.line(
            (self.left, self.bottom()),
            (self.left + self.width, self.bottom()),
            AXIS_COLOR,
            false,
        );
        svg.text(
            self.left + self.width / 2.0,
            self.top - 8.0,
            title,
            Anchor::Middle,
            13.0,
            true,
        );
        svg.rotated_text(self.left - 48.0, self.top + self.height / 2.0, y_label, -90.0);
    }
}

/// Zero-width ranges are widened by 0.5 either side.
fn widen(lo: f64, hi: f64) -> (f64, f64) {
    if hi > lo { (lo, hi) } else { (lo - 0.5, hi + 0.5) }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_maps_range_to_pixels() {
        let p = Panel::new(100.0, 50.0, 200.0, 100.0).with_x(0.0, 10.0);
        assert_eq!(p.x(0.0), 100.0);
        assert_eq!(p.x(10.0), 300.0);
        let mut q = p;
        q.y_range = (0.0, 10.0);
        assert_eq!(q.y(0.0), 150.0);
        assert_eq!(q.y(10.0), 50.0);
    }

    #[test]
    fn degenerate_range_is_widened() {
        let p = Panel::new(0.0, 0.0, 100.0, 100.0).with_x(3.0, 3.0);
        assert_eq!(p.x_range, (2.5, 3.5));
        assert_eq!(p.x(3.0), 50.0);
    }

    #[test]
    fn text_is_escaped() {
        let mut svg = Svg::new(10.0, 10.0);
        svg.text(0.0, 0.0, "AT&T <fiber>", Anchor::Start, 10.0, false);
        let doc = svg.finish();
        assert!(doc.contains("AT&amp;T &lt;fiber&gt;"));
        assert!(doc.starts_with("<svg"));
    }
}
