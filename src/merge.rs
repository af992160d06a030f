//! Merge orchestration.
//!
//! A merge loads the template, applies each instruction in order and
//! serializes the result. The document body lives in a [`MergeContext`]
//! that every step takes by value and hands back, so no step can observe a
//! half-applied instruction.

use crate::archive::{DocxArchive, CONTENT_TYPES_PART, DOCUMENT_PART, DOCUMENT_RELS_PART};
use crate::config::MergeConfig;
use crate::content_types::{ensure_override, OverrideChange};
use crate::envelope::{decode_docx, encode_docx, ImageData};
use crate::error::{MergeError, Result};
use crate::fragments::{cm_to_emu, image_frame, table};
use crate::instruction::{Content, Instruction};
use crate::relationships::{
    append_relationship, empty_relationships, next_relationship_id, IMAGE_RELATIONSHIP_TYPE,
};
use crate::resolver::{replace_image, replace_table, replace_text};
use crate::xml::XmlDocument;

/// The archive and parsed body of one merge in progress.
#[derive(Debug)]
pub struct MergeContext<'c> {
    archive: DocxArchive,
    body: XmlDocument,
    config: &'c MergeConfig,
}

impl<'c> MergeContext<'c> {
    /// Open a template and parse its body.
    pub fn load(template: &[u8], config: &'c MergeConfig) -> Result<Self> {
        let archive = DocxArchive::from_bytes(template)?;
        let xml = archive.read_text(DOCUMENT_PART)?;
        let body = XmlDocument::parse(&xml, DOCUMENT_PART)?;
        Ok(Self {
            archive,
            body,
            config,
        })
    }

    pub fn body(&self) -> &XmlDocument {
        &self.body
    }

    pub fn archive(&self) -> &DocxArchive {
        &self.archive
    }

    /// Apply one instruction. Unsupported kinds and absent placeholders
    /// leave the context unchanged.
    pub fn apply(self, instruction: &Instruction) -> Result<Self> {
        let placeholder = instruction.placeholder.as_str();
        log::debug!(
            "Applying {} instruction for {:?}",
            instruction.content.kind(),
            placeholder
        );
        match &instruction.content {
            Content::Text(text) => Ok(self.apply_text(placeholder, text)),
            Content::Image {
                data_uri,
                width_cm,
                height_cm,
            } => self.apply_image(placeholder, data_uri, *width_cm, *height_cm),
            Content::Table(rows) => Ok(self.apply_table(placeholder, rows)),
            Content::Unsupported(kind) => {
                log::warn!("Skipping instruction with unknown kind {:?}", kind);
                Ok(self)
            }
        }
    }

    fn apply_text(mut self, placeholder: &str, text: &str) -> Self {
        let result = replace_text(&mut self.body, placeholder, text);
        if result.replaced == 0 {
            log::warn!("Placeholder {:?} not found; nothing replaced", placeholder);
        } else {
            log::debug!(
                "Replaced {} text run(s) for {:?} ({:?} formatting)",
                result.replaced,
                placeholder,
                result.formatting
            );
        }
        self
    }

    fn apply_table(mut self, placeholder: &str, rows: &[Vec<String>]) -> Self {
        let tbl = table(rows, self.config.table_total_width);
        let count = replace_table(&mut self.body, placeholder, &tbl);
        if count == 0 {
            log::warn!("Placeholder {:?} not found; nothing replaced", placeholder);
        } else {
            log::debug!("Inserted {} table(s) for {:?}", count, placeholder);
        }
        self
    }

    /// Insert an image. The relationship entry, media file and content-type
    /// override are prepared first and committed together, and only when the
    /// placeholder matched.
    fn apply_image(
        mut self,
        placeholder: &str,
        data_uri: &str,
        width_cm: Option<f64>,
        height_cm: Option<f64>,
    ) -> Result<Self> {
        let image = ImageData::from_data_uri(data_uri)?;

        let rels_xml = match self.archive.read_text(DOCUMENT_RELS_PART) {
            Ok(xml) => xml,
            Err(MergeError::MissingEntry(_)) => empty_relationships(),
            Err(e) => return Err(e),
        };
        let rel_id = next_relationship_id(&rels_xml)?;

        let width = width_cm
            .filter(|w| *w > 0.0)
            .unwrap_or(self.config.default_image_width_cm);
        let height = height_cm
            .filter(|h| *h > 0.0)
            .unwrap_or(self.config.default_image_height_cm);
        let frame = image_frame(rel_id, cm_to_emu(width), cm_to_emu(height));

        let file_name = self.media_file_name(image.extension());
        let target = format!("{}/{}", self.config.media_dir, file_name);
        let media_path = format!("word/{}", target);

        let new_rels = append_relationship(
            &rels_xml,
            DOCUMENT_RELS_PART,
            rel_id,
            IMAGE_RELATIONSHIP_TYPE,
            &target,
        )?;
        let content_types = self.archive.read_text(CONTENT_TYPES_PART)?;
        let (new_content_types, change) = ensure_override(
            &content_types,
            CONTENT_TYPES_PART,
            &format!("/{}", media_path),
            &image.media_type,
        )?;

        let count = replace_image(&mut self.body, placeholder, &frame);
        if count == 0 {
            log::warn!("Placeholder {:?} not found; image not added", placeholder);
            return Ok(self);
        }

        self.archive
            .write_entry(DOCUMENT_RELS_PART, new_rels.into_bytes());
        self.archive.write_entry(&media_path, image.bytes);
        if change != OverrideChange::Unchanged {
            self.archive
                .write_entry(CONTENT_TYPES_PART, new_content_types.into_bytes());
        }
        log::debug!(
            "Embedded {} as {} in {} place(s) for {:?}",
            media_path,
            rel_id,
            count,
            placeholder
        );
        Ok(self)
    }

    /// `<prefix>-<unix millis>.<ext>`, suffixed with `-<n>` if that name is
    /// already taken.
    fn media_file_name(&self, extension: &str) -> String {
        let stem = format!(
            "{}-{}",
            self.config.media_prefix,
            chrono::Utc::now().timestamp_millis()
        );
        let in_archive = |name: &str| {
            self.archive
                .contains(&format!("word/{}/{}", self.config.media_dir, name))
        };

        let mut name = format!("{}.{}", stem, extension);
        let mut n = 1;
        while in_archive(&name) {
            name = format!("{}-{}.{}", stem, n, extension);
            n += 1;
        }
        name
    }

    /// Write the body back and serialize the archive.
    pub fn finalize(mut self) -> Result<Vec<u8>> {
        let xml = self.body.to_xml()?;
        self.archive.write_entry(DOCUMENT_PART, xml.into_bytes());
        self.archive.to_bytes()
    }
}

/// Mail merge engine with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct MailMerge {
    config: MergeConfig,
}

impl MailMerge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MergeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Merge raw DOCX bytes.
    pub fn merge_docx(&self, template: &[u8], instructions: &[Instruction]) -> Result<Vec<u8>> {
        let mut context = MergeContext::load(template, &self.config)?;
        for instruction in instructions {
            context = context.apply(instruction)?;
        }
        context.finalize()
    }

    /// Merge a DOCX data URI and return the result in the same envelope.
    pub fn merge_data_uri(&self, template_uri: &str, instructions: &[Instruction]) -> Result<String> {
        let template = decode_docx(template_uri)?;
        let merged = self.merge_docx(&template, instructions)?;
        Ok(encode_docx(&merged))
    }
}

/// Merge raw DOCX bytes with the default configuration.
pub fn merge_docx(template: &[u8], instructions: &[Instruction]) -> Result<Vec<u8>> {
    MailMerge::new().merge_docx(template, instructions)
}

/// Merge a DOCX data URI with the default configuration.
pub fn merge_data_uri(template_uri: &str, instructions: &[Instruction]) -> Result<String> {
    MailMerge::new().merge_data_uri(template_uri, instructions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relationships::parse_relationships;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing"><w:body><w:p><w:r><w:t>Hello {{NAME}}</w:t></w:r></w:p><w:p><w:r><w:t>{{LOGO}}</w:t></w:r></w:p><w:p><w:r><w:t>{{ITEMS}}</w:t></w:r></w:p></w:body></w:document>"#;
    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;
    const TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#;
    const PNG: &str = "data:image/png;base64,iVBORw0KGgo=";

    fn template(with_rels: bool) -> Vec<u8> {
        let mut archive = DocxArchive::default();
        archive.write_entry(CONTENT_TYPES_PART, TYPES.as_bytes().to_vec());
        archive.write_entry(DOCUMENT_PART, DOC.as_bytes().to_vec());
        if with_rels {
            archive.write_entry(DOCUMENT_RELS_PART, RELS.as_bytes().to_vec());
        }
        archive.to_bytes().unwrap()
    }

    fn media_entries(archive: &DocxArchive) -> Vec<String> {
        archive
            .entry_names()
            .filter(|n| n.starts_with("word/media/"))
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_image_step_updates_all_side_tables() {
        let config = MergeConfig::default();
        let context = MergeContext::load(&template(true), &config).unwrap();
        let context = context
            .apply(&Instruction::image("{{LOGO}}", PNG, None, None))
            .unwrap();

        let rels = parse_relationships(
            &context.archive().read_text(DOCUMENT_RELS_PART).unwrap(),
            "rels",
        )
        .unwrap();
        assert_eq!(rels.len(), 2);
        assert_eq!(rels[1].id, "rId2");
        assert_eq!(rels[1].type_, IMAGE_RELATIONSHIP_TYPE);

        let media = media_entries(context.archive());
        assert_eq!(media.len(), 1);
        assert_eq!(format!("word/{}", rels[1].target), media[0]);
        assert!(media[0].ends_with(".png"));

        let types = context.archive().read_text(CONTENT_TYPES_PART).unwrap();
        let override_entry = format!(r#"PartName="/{}" ContentType="image/png""#, media[0]);
        assert_eq!(types.matches(&override_entry).count(), 1);

        let body = context.body().to_xml().unwrap();
        assert!(body.contains(r#"<wp:extent cx="1080000" cy="1080000"/>"#));
        assert!(body.contains(r#"r:embed="rId2""#));
        assert!(!body.contains("{{LOGO}}"));
    }

    #[test]
    fn test_unmatched_image_changes_nothing() {
        let config = MergeConfig::default();
        let context = MergeContext::load(&template(true), &config).unwrap();
        let context = context
            .apply(&Instruction::image("{{MISSING}}", PNG, None, None))
            .unwrap();
        assert!(media_entries(context.archive()).is_empty());
        assert_eq!(context.archive().read_text(DOCUMENT_RELS_PART).unwrap(), RELS);
        assert_eq!(context.archive().read_text(CONTENT_TYPES_PART).unwrap(), TYPES);
    }

    #[test]
    fn test_two_images_get_distinct_ids_and_files() {
        let config = MergeConfig::default();
        let context = MergeContext::load(&template(true), &config).unwrap();
        let context = context
            .apply(&Instruction::image("{{LOGO}}", PNG, Some(2.0), Some(1.0)))
            .unwrap()
            .apply(&Instruction::image("{{NAME}}", PNG, None, None))
            .unwrap();
        // "Hello {{NAME}}" is not an exact match, so only one image lands
        assert_eq!(media_entries(context.archive()).len(), 1);

        let context = context
            .apply(&Instruction::text("{{ITEMS}}", "{{PIC}}"))
            .unwrap()
            .apply(&Instruction::image("{{PIC}}", PNG, None, None))
            .unwrap();
        let media = media_entries(context.archive());
        assert_eq!(media.len(), 2);
        assert_ne!(media[0], media[1]);
        let body = context.body().to_xml().unwrap();
        assert!(body.contains(r#"<wp:extent cx="720000" cy="360000"/>"#));
        assert!(body.contains(r#"r:embed="rId2""#));
        assert!(body.contains(r#"r:embed="rId3""#));
    }

    #[test]
    fn test_missing_rels_part_is_created() {
        let config = MergeConfig::default();
        let context = MergeContext::load(&template(false), &config).unwrap();
        let context = context
            .apply(&Instruction::image("{{LOGO}}", PNG, None, None))
            .unwrap();
        let rels = parse_relationships(
            &context.archive().read_text(DOCUMENT_RELS_PART).unwrap(),
            "rels",
        )
        .unwrap();
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].id, "rId1");
    }

    #[test]
    fn test_bad_image_is_fatal() {
        let err = merge_docx(
            &template(true),
            &[Instruction::image("{{LOGO}}", "data:text/plain;base64,aGk=", None, None)],
        )
        .unwrap_err();
        assert!(matches!(err, MergeError::InvalidImage(_)));
    }

    #[test]
    fn test_unsupported_kind_is_skipped() {
        let instructions = Instruction::parse_list(
            r#"[{"type": "chart", "placeholder": "{{NAME}}", "content": []},
                {"type": "text", "placeholder": "{{NAME}}", "content": "World"}]"#,
        )
        .unwrap();
        let out = merge_docx(&template(true), &instructions).unwrap();
        let body = DocxArchive::from_bytes(&out)
            .unwrap()
            .read_text(DOCUMENT_PART)
            .unwrap();
        assert!(body.contains("<w:t>Hello World</w:t>"));
    }

    #[test]
    fn test_media_file_name_avoids_collisions() {
        let config = MergeConfig::default().with_media_prefix("pic");
        let mut context = MergeContext::load(&template(true), &config).unwrap();
        let first = context.media_file_name("png");
        assert!(first.starts_with("pic-") && first.ends_with(".png"));
        context
            .archive
            .write_entry(&format!("word/media/{}", first), Vec::new());
        let second = context.media_file_name("png");
        assert_ne!(first, second);
    }

    #[test]
    fn test_envelope_checked_before_archive() {
        let err = merge_data_uri("data:application/zip;base64,!!!", &[]).unwrap_err();
        assert!(matches!(err, MergeError::Envelope(_)));
    }
}
