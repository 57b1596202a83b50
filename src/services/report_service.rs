// src/services/report_service.rs

use chrono::{NaiveDate, Utc};
use genpdf::{elements, style, Element};
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use parking_lot::Mutex;
use rusttype::{point, Font, Scale};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    common::error::AppError,
    db::ReportStorage,
    models::{
        inventory::InventoryItem,
        reports::{ExportFilters, ExportPreview, StockLevelFilter},
    },
    services::inventory_service::InventoryService,
};

pub const FONT_FAMILY: &str = "Roboto";
pub const PDF_TITLE: &str = "Inventario de Insumos de Limpieza";
const IMAGE_TITLE: &str = "Inventario de Insumos";
const NOT_AVAILABLE: &str = "N/A";

const TABLE_HEADERS: [&str; 8] = [
    "Nombre",
    "Categoría",
    "Cantidad",
    "Unidad",
    "Stock Mín.",
    "Estado",
    "Ubicación",
    "Proveedor",
];

// Snapshot PNG: largura lógica de 800px renderizada em 2x
const IMAGE_SCALE: f32 = 2.0;
const IMAGE_WIDTH: f32 = 800.0;
const IMAGE_PADDING: f32 = 20.0;
const IMAGE_HEADER: f32 = 110.0;
const IMAGE_LINE: f32 = 22.0;
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const TEXT_COLOR: Rgb<u8> = Rgb([31, 41, 55]);
const TITLE_COLOR: Rgb<u8> = Rgb([30, 64, 175]);

/// Aplica os filtros do painel de exportação.
pub fn filter_items(items: &[InventoryItem], filters: &ExportFilters) -> Vec<InventoryItem> {
    items
        .iter()
        .filter(|item| {
            filters.selected_categories.is_empty()
                || filters.selected_categories.contains(&item.category)
        })
        .filter(|item| match filters.stock_level {
            StockLevelFilter::All => true,
            StockLevelFilter::Low => item.is_low_stock(),
            StockLevelFilter::Normal => !item.is_low_stock(),
        })
        .filter(|item| filters.include_out_of_stock || !item.is_out_of_stock())
        .cloned()
        .collect()
}

/// Nome do download: `inventario-2025-03-01.pdf`
pub fn download_file_name(date: NaiveDate, extension: &str) -> String {
    format!("inventario-{}.{}", date.format("%Y-%m-%d"), extension)
}

/// Nome no bucket: `inventario_2025_03_01.pdf`. Um arquivo por dia, sobrescrito.
pub fn storage_file_name(date: NaiveDate, extension: &str) -> String {
    format!("inventario_{}.{}", date.format("%Y_%m_%d"), extension)
}

fn or_not_available(value: Option<&str>) -> String {
    match value {
        Some(text) if !text.trim().is_empty() => text.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Uma linha da tabela do PDF, na ordem de `TABLE_HEADERS`.
pub fn table_row(item: &InventoryItem) -> [String; 8] {
    [
        or_not_available(Some(item.name.as_str())),
        or_not_available(Some(item.category.as_str())),
        item.quantity.normalize().to_string(),
        or_not_available(Some(item.unit.as_str())),
        item.min_stock.normalize().to_string(),
        item.status().report_label().to_string(),
        or_not_available(Some(item.location.as_str())),
        or_not_available(item.supplier.as_deref()),
    ]
}

/// Linhas da lista do snapshot PNG.
pub fn snapshot_line(item: &InventoryItem) -> String {
    format!(
        "{} - {} ({} {} {})",
        item.name,
        item.category,
        item.quantity.normalize(),
        item.unit,
        or_not_available(item.supplier.as_deref()),
    )
}

fn render_error(e: impl std::fmt::Display) -> AppError {
    AppError::ReportRender(e.to_string())
}

/// Arquivo gerado, pronto para download.
#[derive(Debug)]
pub struct ExportedReport {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
    pub public_url: Option<String>,
    pub item_count: usize,
}

#[derive(Clone)]
pub struct ReportService {
    inventory: InventoryService,
    fonts_dir: PathBuf,
    storage: Option<Arc<dyn ReportStorage>>,
    latest_url: Arc<Mutex<Option<String>>>,
}

impl ReportService {
    pub fn new(
        inventory: InventoryService,
        fonts_dir: impl Into<PathBuf>,
        storage: Option<Arc<dyn ReportStorage>>,
    ) -> Self {
        Self {
            inventory,
            fonts_dir: fonts_dir.into(),
            storage,
            latest_url: Arc::new(Mutex::new(None)),
        }
    }

    pub fn preview(&self, filters: &ExportFilters) -> ExportPreview {
        let items = filter_items(&self.inventory.items(), filters);

        ExportPreview {
            to_export: items.len(),
            low_stock: items.iter().filter(|item| item.is_low_stock()).count(),
            out_of_stock: items.iter().filter(|item| item.is_out_of_stock()).count(),
        }
    }

    fn items_to_export(&self, filters: &ExportFilters) -> Result<Vec<InventoryItem>, AppError> {
        let items = filter_items(&self.inventory.items(), filters);
        if items.is_empty() {
            return Err(AppError::NothingToExport);
        }
        Ok(items)
    }

    pub async fn export_pdf(&self, filters: &ExportFilters) -> Result<ExportedReport, AppError> {
        let items = self.items_to_export(filters)?;
        let today = Utc::now().date_naive();

        let bytes = self.render_pdf(&items, today)?;

        let public_url = self
            .publish(&storage_file_name(today, "pdf"), bytes.clone(), "application/pdf")
            .await;
        if let Some(url) = &public_url {
            *self.latest_url.lock() = Some(url.clone());
        }

        tracing::info!("📄 PDF exportado: se exportaron {} productos", items.len());
        Ok(ExportedReport {
            file_name: download_file_name(today, "pdf"),
            content_type: "application/pdf",
            bytes,
            public_url,
            item_count: items.len(),
        })
    }

    pub async fn export_image(&self, filters: &ExportFilters) -> Result<ExportedReport, AppError> {
        let items = self.items_to_export(filters)?;
        let today = Utc::now().date_naive();

        let bytes = self.render_png(&items, today)?;

        let public_url = self
            .publish(&storage_file_name(today, "png"), bytes.clone(), "image/png")
            .await;

        tracing::info!("🖼️ Imagen exportada: se exportaron {} productos", items.len());
        Ok(ExportedReport {
            file_name: download_file_name(today, "png"),
            content_type: "image/png",
            bytes,
            public_url,
            item_count: items.len(),
        })
    }

    /// URL anexada no e-mail: a do último PDF publicado ou, sem ele, a URL
    /// pública do PDF do dia.
    pub fn attachment_url(&self, today: NaiveDate) -> Result<String, AppError> {
        if let Some(url) = self.latest_url.lock().clone() {
            return Ok(url);
        }

        let storage = self
            .storage
            .as_ref()
            .ok_or(AppError::IntegrationDisabled("almacenamiento de reportes"))?;
        Ok(storage.public_url(&storage_file_name(today, "pdf")))
    }

    // Falha no upload não derruba a exportação: o arquivo ainda é devolvido.
    async fn publish(&self, file_name: &str, bytes: Vec<u8>, content_type: &str) -> Option<String> {
        let storage = self.storage.as_ref()?;

        match storage.upload(file_name, bytes, content_type).await {
            Ok(url) => {
                tracing::info!("Archivo subido al almacenamiento: {}", file_name);
                Some(url)
            }
            Err(e) => {
                tracing::warn!("Error al subir archivo {}: {}", file_name, e);
                None
            }
        }
    }

    // ---
    // PDF (genpdf)
    // ---

    fn render_pdf(&self, items: &[InventoryItem], today: NaiveDate) -> Result<Vec<u8>, AppError> {
        let font_family = genpdf::fonts::from_files(&self.fonts_dir, FONT_FAMILY, None).map_err(|_| {
            AppError::FontNotFound(format!(
                "Fuente {} no encontrada en {}",
                FONT_FAMILY,
                self.fonts_dir.display()
            ))
        })?;

        let mut doc = genpdf::Document::new(font_family);
        doc.set_title(PDF_TITLE);
        doc.set_font_size(8);

        let mut decorator = genpdf::SimplePageDecorator::new();
        decorator.set_margins(10);
        decorator.set_header(|page| {
            let mut number = elements::Paragraph::new(format!("Página {}", page));
            number.set_alignment(genpdf::Alignment::Right);
            number.styled(style::Style::new().with_font_size(8))
        });
        doc.set_page_decorator(decorator);

        // --- CABEÇALHO ---
        doc.push(
            elements::Paragraph::new(PDF_TITLE).styled(style::Style::new().bold().with_font_size(20)),
        );
        doc.push(
            elements::Paragraph::new(format!("Fecha: {}", today.format("%d/%m/%Y")))
                .styled(style::Style::new().with_font_size(12)),
        );
        doc.push(elements::Break::new(1.5));

        // --- TABELA ---
        let mut table = elements::TableLayout::new(vec![3, 2, 1, 1, 1, 1, 2, 2]);
        table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));

        let header_style = style::Style::new()
            .bold()
            .with_color(style::Color::Rgb(59, 130, 246));
        let mut header = table.row();
        for title in TABLE_HEADERS {
            header.push_element(elements::Paragraph::new(title).styled(header_style).padded(1));
        }
        header.push().map_err(render_error)?;

        for item in items {
            let mut row = table.row();
            for cell in table_row(item) {
                row.push_element(elements::Paragraph::new(cell).padded(1));
            }
            row.push().map_err(render_error)?;
        }

        doc.push(table);

        // Renderiza para buffer em memória
        let mut buffer = Vec::new();
        doc.render(&mut buffer).map_err(render_error)?;

        Ok(buffer)
    }

    // ---
    // PNG (image + rusttype)
    // ---

    fn load_font(&self, style: &str) -> Result<Font<'static>, AppError> {
        let path = font_path(&self.fonts_dir, style);
        let bytes = std::fs::read(&path)
            .map_err(|_| AppError::FontNotFound(format!("{}", path.display())))?;
        Font::try_from_vec(bytes).ok_or_else(|| AppError::FontNotFound(format!("{}", path.display())))
    }

    fn render_png(&self, items: &[InventoryItem], today: NaiveDate) -> Result<Vec<u8>, AppError> {
        let regular = self.load_font("Regular")?;
        let bold = self.load_font("Bold")?;

        let px = |logical: f32| logical * IMAGE_SCALE;
        let width = px(IMAGE_WIDTH) as u32;
        let height = px(IMAGE_PADDING * 2.0 + IMAGE_HEADER + IMAGE_LINE * items.len() as f32).ceil() as u32;
        let mut canvas = RgbImage::from_pixel(width, height, WHITE);

        // Título centralizado
        let title_scale = Scale::uniform(px(24.0));
        let title_x = (width as f32 - text_width(&bold, IMAGE_TITLE, title_scale)) / 2.0;
        draw_text(&mut canvas, &bold, IMAGE_TITLE, title_x, px(IMAGE_PADDING), title_scale, TITLE_COLOR);

        let body = Scale::uniform(px(14.0));
        let left = px(IMAGE_PADDING);
        let mut y = px(IMAGE_PADDING + 44.0);

        let date_line = format!("Fecha: {}", today.format("%d/%m/%Y"));
        draw_text(&mut canvas, &regular, &date_line, left, y, body, TEXT_COLOR);
        y += px(IMAGE_LINE);

        let count_line = format!("Total de productos: {}", items.len());
        draw_text(&mut canvas, &regular, &count_line, left, y, body, TEXT_COLOR);
        y += px(IMAGE_LINE * 1.5);

        for item in items {
            let line = format!("• {}", snapshot_line(item));
            draw_text(&mut canvas, &regular, &line, left + px(10.0), y, body, TEXT_COLOR);
            y += px(IMAGE_LINE);
        }

        let mut buffer = Vec::new();
        DynamicImage::ImageRgb8(canvas)
            .write_to(&mut buffer, ImageOutputFormat::Png)
            .map_err(render_error)?;

        Ok(buffer)
    }
}

// Mesmo esquema de nomes que o genpdf espera: Roboto-Regular.ttf, Roboto-Bold.ttf...
fn font_path(dir: &Path, style: &str) -> PathBuf {
    dir.join(format!("{}-{}.ttf", FONT_FAMILY, style))
}

fn text_width(font: &Font<'_>, text: &str, scale: Scale) -> f32 {
    font.layout(text, scale, point(0.0, 0.0))
        .last()
        .map(|glyph| glyph.position().x + glyph.unpositioned().h_metrics().advance_width)
        .unwrap_or(0.0)
}

fn draw_text(
    canvas: &mut RgbImage,
    font: &Font<'_>,
    text: &str,
    x: f32,
    y: f32,
    scale: Scale,
    color: Rgb<u8>,
) {
    let ascent = font.v_metrics(scale).ascent;
    let (width, height) = canvas.dimensions();

    for glyph in font.layout(text, scale, point(x, y + ascent)) {
        let Some(bounds) = glyph.pixel_bounding_box() else {
            continue;
        };

        glyph.draw(|gx, gy, coverage| {
            let px = gx as i32 + bounds.min.x;
            let py = gy as i32 + bounds.min.y;
            if px < 0 || py < 0 || px as u32 >= width || py as u32 >= height {
                return;
            }

            let pixel = canvas.get_pixel_mut(px as u32, py as u32);
            for channel in 0..3 {
                let background = pixel.0[channel] as f32;
                let blended = background + (color.0[channel] as f32 - background) * coverage;
                pixel.0[channel] = blended.round() as u8;
            }
        });
    }
}
