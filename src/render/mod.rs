//! Output document contract shared with the downstream publishing system.
//!
//! Every approved corpus entry serializes as a metadata block followed by
//! fixed top-level sections in a bit-for-bit stable order. The same shape
//! rules validate oracle output before any state advances.

use serde::{Deserialize, Serialize};

use crate::decompose::DocumentType;

const TEMPLATE_YAML: &str = include_str!("../../assets/document_template.yaml");
const STYLE_YAML: &str = include_str!("../../assets/style_lexicon.yaml");

/// Required/optional section layout per document type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentTemplate {
    pub metadata_fields: Vec<String>,
    pub required_sections: RequiredSections,
    #[serde(default)]
    pub optional_sections: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequiredSections {
    pub policy: Vec<String>,
    pub procedure: Vec<String>,
}

/// Style lexicon backing the auditability lint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleLexicon {
    pub vague_phrases: Vec<String>,
    #[serde(default)]
    pub binding_modals: Vec<String>,
}

impl DocumentTemplate {
    /// The built-in template shipped with the crate.
    pub fn builtin() -> Self {
        serde_yaml::from_str(TEMPLATE_YAML).expect("built-in document template must parse")
    }

    pub fn required_for(&self, doc_type: DocumentType) -> &[String] {
        match doc_type {
            DocumentType::Policy => &self.required_sections.policy,
            DocumentType::Procedure => &self.required_sections.procedure,
        }
    }
}

impl StyleLexicon {
    pub fn builtin() -> Self {
        serde_yaml::from_str(STYLE_YAML).expect("built-in style lexicon must parse")
    }
}

/// One parsed top-level section of a document body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub body: String,
}

/// A document body split into its top-level sections.
#[derive(Debug, Clone, Default)]
pub struct ParsedDocument {
    pub sections: Vec<Section>,
}

impl ParsedDocument {
    pub fn section(&self, title: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|section| section.title.eq_ignore_ascii_case(title))
    }
}

/// Splits markdown-style content on `## ` headings. A leading `# Title`
/// line and front matter are skipped; prose before the first heading is
/// ignored.
pub fn parse_document(content: &str) -> ParsedDocument {
    let mut sections: Vec<Section> = Vec::new();
    let mut current: Option<Section> = None;
    for line in strip_front_matter(content).lines() {
        if let Some(title) = line.strip_prefix("## ") {
            if let Some(section) = current.take() {
                sections.push(section);
            }
            current = Some(Section {
                title: title.trim().to_string(),
                body: String::new(),
            });
        } else if let Some(section) = current.as_mut() {
            section.body.push_str(line);
            section.body.push('\n');
        }
    }
    if let Some(section) = current.take() {
        sections.push(section);
    }
    for section in &mut sections {
        section.body = section.body.trim().to_string();
    }
    ParsedDocument { sections }
}

/// Returns the required sections missing from `content` for `doc_type`.
/// An empty result means the draft satisfies the template shape.
pub fn missing_sections(
    content: &str,
    doc_type: DocumentType,
    template: &DocumentTemplate,
) -> Vec<String> {
    let parsed = parse_document(content);
    template
        .required_for(doc_type)
        .iter()
        .filter(|required| parsed.section(required).is_none())
        .cloned()
        .collect()
}

/// Serializes an approved document: metadata block, then required
/// sections in contract order, then any extra sections in draft order.
pub fn serialize_document(
    title: &str,
    category: &str,
    order_index: usize,
    doc_type: DocumentType,
    content: &str,
    template: &DocumentTemplate,
) -> String {
    let parsed = parse_document(content);
    let mut output = String::new();
    output.push_str("---\n");
    output.push_str(&format!("title: {}\n", title));
    output.push_str(&format!("category: {}\n", category));
    output.push_str(&format!("order: {}\n", order_index));
    output.push_str("---\n\n");
    output.push_str(&format!("# {}\n", title));

    let required = template.required_for(doc_type);
    for name in required {
        if let Some(section) = parsed.section(name) {
            push_section(&mut output, &section.title, &section.body);
        }
    }
    for section in &parsed.sections {
        if !required
            .iter()
            .any(|name| name.eq_ignore_ascii_case(&section.title))
        {
            push_section(&mut output, &section.title, &section.body);
        }
    }
    output
}

fn push_section(output: &mut String, title: &str, body: &str) {
    output.push('\n');
    output.push_str(&format!("## {}\n", title));
    output.push_str(body);
    output.push('\n');
}

fn strip_front_matter(content: &str) -> &str {
    let trimmed = content.trim_start();
    if let Some(rest) = trimmed.strip_prefix("---\n") {
        if let Some(end) = rest.find("\n---") {
            let after = &rest[end + 4..];
            return after.trim_start_matches('\n');
        }
    }
    content
}
