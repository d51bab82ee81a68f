//! Line-oriented tokenizer for ReShade effect sources
//!
//! An effect is split into runs of verbatim text and recognised uniform
//! declarations. Rendering copies verbatim runs (and any block that is not
//! being patched) back byte for byte.

use super::{Targets, Uniform};

/// One piece of an effect source
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Text copied through untouched
    Verbatim(String),
    /// A recognised uniform declaration, from its opening line through the
    /// line holding the closing `>`
    Block { uniform: Uniform, raw: String },
}

/// Parsed effect source
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EffectSource {
    segments: Vec<Segment>,
}

impl EffectSource {
    pub fn parse(text: &str) -> Self {
        let lines: Vec<&str> = text.split_inclusive('\n').collect();
        let mut segments = Vec::new();
        let mut verbatim = String::new();
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i];
            let opened = Uniform::ALL.into_iter().find(|u| u.opens(line));

            if let Some(uniform) = opened {
                if let Some(close) = (i..lines.len()).find(|&j| lines[j].contains('>')) {
                    if !verbatim.is_empty() {
                        segments.push(Segment::Verbatim(std::mem::take(&mut verbatim)));
                    }
                    segments.push(Segment::Block {
                        uniform,
                        raw: lines[i..=close].concat(),
                    });
                    i = close + 1;
                    continue;
                }
                // unterminated declaration: leave it alone
                tracing::warn!(uniform = ?uniform, line = i + 1, "Uniform declaration has no closing '>'");
            }

            verbatim.push_str(line);
            i += 1;
        }

        if !verbatim.is_empty() {
            segments.push(Segment::Verbatim(verbatim));
        }

        Self { segments }
    }

    #[cfg(test)]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Uniforms declared in this source, in file order
    #[cfg(test)]
    pub fn uniforms(&self) -> impl Iterator<Item = Uniform> + '_ {
        self.segments.iter().filter_map(|s| match s {
            Segment::Block { uniform, .. } => Some(*uniform),
            Segment::Verbatim(_) => None,
        })
    }

    /// Serialize, swapping targeted blocks for their canonical form.
    /// Returns the text and how many blocks were replaced.
    pub fn render(&self, targets: &Targets) -> (String, usize) {
        let mut out = String::new();
        let mut replaced = 0;

        for segment in &self.segments {
            match segment {
                Segment::Verbatim(text) => out.push_str(text),
                Segment::Block { uniform, raw } => match targets.get(uniform) {
                    Some(value) => {
                        out.push_str(&uniform.canonical_block(value));
                        replaced += 1;
                    }
                    None => out.push_str(raw),
                },
            }
        }

        (out, replaced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::UniformValue;

    const SOURCE: &str = "#include \"ReShadeUI.fxh\"\n\
uniform float MuraMapScale < __UNIFORM_SLIDER_FLOAT1\n\
\tui_min = 0.0; ui_max = 5;\n\
> = 0.1;\n\
\n\
uniform float Intensity < ui_label = \"Grain\"; > = 0.5;\n\
uniform float MuraMapScaleExtra = 1.0;\n\
float4 main() : SV_Target { return 0; }\n";

    #[test]
    fn test_parse_finds_blocks_in_order() {
        let source = EffectSource::parse(SOURCE);
        let found: Vec<_> = source.uniforms().collect();
        assert_eq!(found, vec![Uniform::MuraMapScale, Uniform::GrainIntensity]);
    }

    #[test]
    fn test_similar_names_are_not_blocks() {
        let source = EffectSource::parse("uniform float MuraMapScaleExtra < > = 1.0;\n");
        assert_eq!(source.uniforms().count(), 0);
    }

    #[test]
    fn test_single_line_block() {
        let source = EffectSource::parse(SOURCE);
        let raw = source.segments().iter().find_map(|s| match s {
            Segment::Block { uniform: Uniform::GrainIntensity, raw } => Some(raw.clone()),
            _ => None,
        });
        assert_eq!(raw.as_deref(), Some("uniform float Intensity < ui_label = \"Grain\"; > = 0.5;\n"));
    }

    #[test]
    fn test_render_without_targets_is_identity() {
        let source = EffectSource::parse(SOURCE);
        let (text, replaced) = source.render(&Targets::new());
        assert_eq!(text, SOURCE);
        assert_eq!(replaced, 0);
    }

    #[test]
    fn test_render_replaces_only_targets() {
        let source = EffectSource::parse(SOURCE);
        let mut targets = Targets::new();
        targets.insert(Uniform::GrainIntensity, UniformValue::Float(0.01));
        let (text, replaced) = source.render(&targets);

        assert_eq!(replaced, 1);
        assert!(text.contains("> = 0.1;\n"));
        assert!(text.contains("> = 0.01;\n"));
        assert!(!text.contains("> = 0.5;"));
        assert!(text.ends_with("float4 main() : SV_Target { return 0; }\n"));
    }

    #[test]
    fn test_unterminated_block_is_verbatim() {
        let text = "uniform float MuraMapScale < __UNIFORM_SLIDER_FLOAT1\n\tui_min = 0.0;\n";
        let source = EffectSource::parse(text);
        assert_eq!(source.uniforms().count(), 0);

        let mut targets = Targets::new();
        targets.insert(Uniform::MuraMapScale, UniformValue::Float(0.2));
        assert_eq!(source.render(&targets).0, text);
    }

    #[test]
    fn test_missing_trailing_newline_preserved() {
        let text = "uniform float Intensity < > = 0.5;\n// end";
        let source = EffectSource::parse(text);
        assert_eq!(source.render(&Targets::new()).0, text);
    }
}
