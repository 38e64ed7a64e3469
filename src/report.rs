//! Multi-page PDF assembly.
//!
//! The report is the one resource in the pipeline with a scoped lifecycle:
//! opened once, pages appended in render order, written exactly once.
//! Dropping an unsaved report writes nothing, so a failure partway through
//! rendering leaves no partial output behind.

use crate::charts::{ChartError, PageImage};
use crate::dataset::{Device, Direction};
use log::*;
use printpdf::{
    ColorBits, ColorSpace, Image, ImageTransform, ImageXObject, Mm, PdfDocument,
    PdfDocumentReference, Px,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use thiserror::Error;

/// Pages are embedded at this resolution, giving a landscape page a little
/// over A5 in size for a 1200x800 chart.
const DPI: f32 = 150.0;
const MM_PER_INCH: f32 = 25.4;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to draw page: {0}")]
    Chart(#[from] ChartError),
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to assemble PDF: {0}")]
    Pdf(#[from] printpdf::Error),
}

/// Identifies each page the report can contain, in lieu of inspecting the
/// PDF itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Summary(Device),
    ComparativeBox,
    HourlyGrid(Device),
    Cdf(Device, Direction),
    PeakHistogram(Device, Direction),
    QuantileQuantile(Direction),
    Scatter(Device),
}

pub struct Report {
    doc: PdfDocumentReference,
    pages: Vec<PageKind>,
}

impl Report {
    pub fn new(title: &str) -> Report {
        // Pin the metadata dates so identical inputs produce identical bytes.
        let epoch = time::OffsetDateTime::UNIX_EPOCH;
        let doc = PdfDocument::empty(title)
            .with_creation_date(epoch)
            .with_mod_date(epoch);
        Report { doc, pages: Vec::new() }
    }

    /// Appends one rendered page.  The pixel buffer is consumed and released
    /// as soon as it is embedded, keeping peak memory independent of the
    /// total page count.
    pub fn append_page(&mut self, kind: PageKind, image: PageImage) {
        let width_mm = Mm(image.width as f32 * MM_PER_INCH / DPI);
        let height_mm = Mm(image.height as f32 * MM_PER_INCH / DPI);
        let (page, layer) = self.doc.add_page(width_mm, height_mm, "chart");
        let xobject = ImageXObject {
            width: Px(image.width as usize),
            height: Px(image.height as usize),
            color_space: ColorSpace::Rgb,
            bits_per_component: ColorBits::Bit8,
            interpolate: false,
            image_data: image.rgb,
            image_filter: None,
            smask: None,
            clipping_bbox: None,
        };
        Image::from(xobject).add_to_layer(
            self.doc.get_page(page).get_layer(layer),
            ImageTransform {
                dpi: Some(DPI),
                ..Default::default()
            },
        );
        debug!("appended page {}: {:?}", self.pages.len() + 1, kind);
        self.pages.push(kind);
    }

    /// The kinds of the pages appended so far, in order.
    pub fn pages(&self) -> &[PageKind] {
        &self.pages
    }

    /// Writes the document out, consuming the report.
    pub fn save(self, path: &Path) -> Result<(), ReportError> {
        let file = File::create(path)?;
        self.doc.save(&mut BufWriter::new(file))?;
        Ok(())
    }
}
