//! Terminal viewer engine: renders a presentation as a text outline.
//!
//! A `.pptx` file is a zip archive with one `ppt/slides/slideN.xml` part per
//! slide; the visible text lives in `<a:t>` runs grouped into `<a:p>`
//! paragraphs. Legacy binary `.ppt` files are rejected at load time.

use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex, PoisonError};

use client::state::document::{Viewer, ViewerError, ViewerFeatures, ViewerHost};
use xml::reader::{EventReader, XmlEvent};
use zip::ZipArchive;

const SLIDE_PREFIX: &str = "ppt/slides/slide";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outline {
    pub name: String,
    /// Paragraphs per slide, in slide order.
    pub slides: Vec<Vec<String>>,
}

impl Outline {
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = format!("== {} ({} slides) ==\n", self.name, self.slides.len());
        for (i, paragraphs) in self.slides.iter().enumerate() {
            let body = if paragraphs.is_empty() { "(no text)".to_owned() } else { paragraphs.join(" / ") };
            out.push_str(&format!("[{}] {body}\n", i + 1));
        }
        out
    }
}

/// What the terminal currently shows. Shared between the host, its viewer
/// and the code that prints it.
pub type Screen = Arc<Mutex<Option<Outline>>>;

fn set_screen(screen: &Screen, outline: Option<Outline>) {
    *screen.lock().unwrap_or_else(PoisonError::into_inner) = outline;
}

// =============================================================================
// HOST
// =============================================================================

pub struct OutlineHost {
    screen: Screen,
}

impl OutlineHost {
    #[must_use]
    pub fn new() -> (Self, Screen) {
        let screen = Screen::default();
        (Self { screen: screen.clone() }, screen)
    }
}

impl ViewerHost for OutlineHost {
    fn clear(&mut self) {
        set_screen(&self.screen, None);
    }

    fn create_viewer(&mut self, features: &ViewerFeatures) -> Result<Box<dyn Viewer>, ViewerError> {
        tracing::debug!(toolbar = features.toolbar_group, "outline viewer created");
        Ok(Box::new(OutlineViewer { screen: self.screen.clone() }))
    }
}

pub struct OutlineViewer {
    screen: Screen,
}

impl Viewer for OutlineViewer {
    fn load_document(&mut self, bytes: &[u8], filename: &str) -> Result<(), ViewerError> {
        let outline = parse_outline(bytes, filename)?;
        set_screen(&self.screen, Some(outline));
        Ok(())
    }

    fn dispose(&mut self) {
        set_screen(&self.screen, None);
    }
}

// =============================================================================
// PARSING
// =============================================================================

/// Read the slide text out of a `.pptx` archive.
///
/// # Errors
///
/// Returns `ViewerError::Load` when the bytes are not a zip archive or a
/// slide part cannot be read.
pub fn parse_outline(bytes: &[u8], name: &str) -> Result<Outline, ViewerError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ViewerError::Load(format!("{name} is not an Office Open XML presentation: {e}")))?;

    let mut parts: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|n| slide_number(n).map(|i| (i, n.to_owned())))
        .collect();
    parts.sort_unstable();

    let mut slides = Vec::with_capacity(parts.len());
    for (_, part) in parts {
        let mut xml = String::new();
        archive
            .by_name(&part)
            .map_err(|e| ViewerError::Load(format!("{part}: {e}")))?
            .read_to_string(&mut xml)
            .map_err(|e| ViewerError::Load(format!("{part}: {e}")))?;
        slides.push(paragraphs(&xml));
    }
    Ok(Outline { name: name.to_owned(), slides })
}

/// `ppt/slides/slide12.xml` → 12. Layouts, masters and `_rels` parts are
/// skipped.
fn slide_number(part: &str) -> Option<u32> {
    part.strip_prefix(SLIDE_PREFIX)?.strip_suffix(".xml")?.parse().ok()
}

fn paragraphs(xml: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    for event in EventReader::new(xml.as_bytes()) {
        match event {
            Ok(XmlEvent::StartElement { name, .. }) if name.local_name == "t" => in_text = true,
            Ok(XmlEvent::Characters(text)) if in_text => current.push_str(&text),
            Ok(XmlEvent::EndElement { name }) => match name.local_name.as_str() {
                "t" => in_text = false,
                "p" => {
                    let trimmed = current.trim();
                    if !trimmed.is_empty() {
                        out.push(trimmed.to_owned());
                    }
                    current.clear();
                }
                _ => {}
            },
            Err(e) => {
                tracing::warn!(error = %e, "slide xml parse stopped early");
                break;
            }
            _ => {}
        }
    }
    out
}

#[cfg(test)]
#[path = "outline_test.rs"]
mod outline_test;
