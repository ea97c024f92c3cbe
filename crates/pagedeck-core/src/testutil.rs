//! Shared test fixtures: in-memory PDFs and a stub rasterizer.

use lopdf::{content::Content, content::Operation, dictionary, Dictionary, Document, Object, Stream};

use crate::error::PageDeckError;
use crate::render::{PageRenderer, RasterSurface};
use crate::source::SourceDocument;
use crate::store::{InputFile, PageStore};

/// Build a valid PDF with `num_pages` US Letter pages, each carrying a
/// one-line text stream.
pub fn create_test_pdf(num_pages: u32) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut page_ids = Vec::new();

    for i in 0..num_pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![Object::Name(b"F1".to_vec()), Object::Integer(12)],
                ),
                Operation::new("Td", vec![Object::Integer(100), Object::Integer(700)]),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        format!("Page {}", i + 1).into_bytes(),
                        lopdf::StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));

        let page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
        };
        page_ids.push(doc.add_object(page));
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Count" => num_pages as i64,
        "Kids" => page_ids.iter().map(|&id| Object::Reference(id)).collect::<Vec<_>>(),
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Renderer stub: emits small gray surfaces without touching page
/// content, counting successful renders.
pub struct StubRenderer {
    pub rendered: usize,
    failing_pages: Vec<usize>,
}

impl StubRenderer {
    pub fn new() -> Self {
        Self {
            rendered: 0,
            failing_pages: Vec::new(),
        }
    }

    /// A stub that fails on the given page indices of every document.
    pub fn failing_on(pages: &[usize]) -> Self {
        Self {
            rendered: 0,
            failing_pages: pages.to_vec(),
        }
    }
}

impl PageRenderer for StubRenderer {
    fn render_page(
        &mut self,
        source: &SourceDocument,
        page_index: usize,
        scale: f32,
    ) -> Result<RasterSurface, PageDeckError> {
        if self.failing_pages.contains(&page_index) {
            return Err(PageDeckError::RenderError(format!(
                "stub failure on page {}",
                page_index
            )));
        }
        self.rendered += 1;
        let (width, height) = source.page_media_size(page_index);
        Ok(RasterSurface::from_pixel(
            (width as f32 * scale).round().max(1.0) as u32,
            (height as f32 * scale).round().max(1.0) as u32,
            image::Rgba([200, 200, 200, 255]),
        ))
    }
}

/// Store preloaded with one generated document per entry, `page_counts[i]`
/// pages each.
pub fn load_store(page_counts: &[u32]) -> PageStore {
    let named: Vec<(String, u32)> = page_counts
        .iter()
        .enumerate()
        .map(|(i, &pages)| (format!("doc-{}.pdf", i), pages))
        .collect();
    let borrowed: Vec<(&str, u32)> = named.iter().map(|(n, p)| (n.as_str(), *p)).collect();
    load_store_named(&borrowed)
}

/// Like [`load_store`] with explicit file names.
pub fn load_store_named(files: &[(&str, u32)]) -> PageStore {
    let mut store = PageStore::new();
    let mut renderer = StubRenderer::new();
    let inputs: Vec<InputFile> = files
        .iter()
        .map(|&(name, pages)| InputFile::new(name, create_test_pdf(pages)))
        .collect();
    store
        .load_documents(
            &inputs,
            &mut renderer,
            &crate::render::CancelToken::new(),
            &mut |_, _| {},
        )
        .expect("fixture load failed");
    store
}
