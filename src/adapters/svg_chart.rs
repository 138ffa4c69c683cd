//! SVG serialisation of a chart [`Scene`].

use crate::domain::chart::scene::{Anchor, Baseline, DrawCommand, Scene, Stroke, TextStyle};

pub const FONT_FAMILY: &str = "system-ui, -apple-system, sans-serif";

pub fn scene_to_svg(scene: &Scene) -> String {
    let mut out = format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}" font-family="{FONT_FAMILY}">
<rect x="0" y="0" width="{w:.0}" height="{h:.0}" fill="#ffffff"/>
"##,
        w = scene.width,
        h = scene.height,
    );
    for layer in &scene.layers {
        if layer.commands.is_empty() {
            continue;
        }
        out.push_str(&format!("<g class=\"{}\">\n", layer.layer.as_str()));
        for command in &layer.commands {
            out.push_str(&command_to_svg(command));
            out.push('\n');
        }
        out.push_str("</g>\n");
    }
    out.push_str("</svg>\n");
    out
}

fn command_to_svg(command: &DrawCommand) -> String {
    match command {
        DrawCommand::Rect {
            x,
            y,
            width,
            height,
            fill,
            opacity,
        } => format!(
            r#"<rect x="{x:.1}" y="{y:.1}" width="{width:.1}" height="{height:.1}" fill="{fill}" fill-opacity="{opacity}"/>"#
        ),
        DrawCommand::Line { from, to, stroke } => format!(
            r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}"{}/>"#,
            from.0,
            from.1,
            to.0,
            to.1,
            stroke_attrs(stroke)
        ),
        DrawCommand::Polyline { points, stroke } => {
            let points: Vec<String> = points
                .iter()
                .map(|(x, y)| format!("{x:.1},{y:.1}"))
                .collect();
            format!(
                r#"<polyline points="{}" fill="none" stroke-linejoin="round"{}/>"#,
                points.join(" "),
                stroke_attrs(stroke)
            )
        }
        DrawCommand::Circle {
            cx,
            cy,
            r,
            fill,
            stroke,
        } => format!(
            r#"<circle cx="{cx:.1}" cy="{cy:.1}" r="{r}" fill="{fill}"{}/>"#,
            stroke_attrs(stroke)
        ),
        DrawCommand::Text { x, y, text, style } => format!(
            r#"<text x="{x:.1}" y="{y:.1}"{}>{}</text>"#,
            text_attrs(style),
            escape(text)
        ),
    }
}

fn stroke_attrs(stroke: &Stroke) -> String {
    let mut attrs = format!(r#" stroke="{}" stroke-width="{}""#, stroke.color, stroke.width);
    if !stroke.dash.is_empty() {
        let dash: Vec<String> = stroke.dash.iter().map(|d| d.to_string()).collect();
        attrs.push_str(&format!(r#" stroke-dasharray="{}""#, dash.join(",")));
    }
    attrs
}

fn text_attrs(style: &TextStyle) -> String {
    let anchor = match style.anchor {
        Anchor::Start => "start",
        Anchor::Middle => "middle",
        Anchor::End => "end",
    };
    let baseline = match style.baseline {
        Baseline::Top => "hanging",
        Baseline::Middle => "middle",
        Baseline::Bottom => "text-after-edge",
        Baseline::Alphabetic => "alphabetic",
    };
    let mut attrs = format!(
        r#" font-size="{}" text-anchor="{anchor}" dominant-baseline="{baseline}" fill="{}""#,
        style.size, style.fill
    );
    if style.bold {
        attrs.push_str(r#" font-weight="bold""#);
    }
    if let Some(halo) = &style.halo {
        attrs.push_str(&format!(
            r#" stroke="{}" stroke-width="{}" paint-order="stroke""#,
            halo.color, halo.width
        ));
    }
    attrs
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}
