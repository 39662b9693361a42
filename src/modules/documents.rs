//! Printable agreement documents
//!
//! [`AgreementSheet`] holds everything that goes on the page as plain text, so
//! the layout rules can be tested without producing a PDF. [`render_pdf`]
//! draws a sheet onto a single letter page.

use chrono::NaiveDateTime;
use printpdf::image_crate;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfLayerReference, Point, Rgb,
};

use crate::domain::finance::format_rwf;
use crate::domain::{AgreementType, DomainError};
use crate::models::{agreement, phone, user};

const PAGE_WIDTH: f32 = 215.9;
const PAGE_HEIGHT: f32 = 279.4;
const MARGIN: f32 = 17.6;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const ROW_HEIGHT: f32 = 5.2;
const BODY_SIZE: f32 = 7.0;
const TERMS_WRAP: usize = 150;

/// Column widths of the four-column details table, in millimetres.
const COLUMNS: [f32; 4] = [35.6, 45.7, 35.6, 43.8];

const BUY_TERMS: &[&str] = &[
    "I, the undersigned seller, confirm that I am the lawful owner of the phone described above and have sold it to the registered dealer. I understand and acknowledge that:",
    "- This agreement constitutes a binding contract between the parties mentioned above.",
    "- All information provided is accurate and complete to the best of my knowledge.",
    "- This agreement may be used for verification by relevant authorities and law enforcement.",
    "- The phone is free of any claim, lien or report of theft.",
    "- Any disputes arising from this agreement shall be resolved in accordance with applicable law.",
];

const SELL_TERMS: &[&str] = &[
    "I, the undersigned buyer, confirm that I have legally purchased the phone described above from the registered dealer. I understand and acknowledge that:",
    "- This agreement constitutes a binding contract between the parties mentioned above.",
    "- All information provided is accurate and complete to the best of my knowledge.",
    "- This agreement may be used for verification by relevant authorities and law enforcement.",
    "- The phone has been inspected and is accepted in the condition described above.",
    "- Any disputes arising from this agreement shall be resolved in accordance with applicable law.",
];

/// Images placed on the sheet. Missing ones render as placeholders.
#[derive(Debug, Default, Clone)]
pub struct SheetImages {
    pub id_photo: Option<Vec<u8>>,
    pub seller_signature: Option<Vec<u8>>,
    pub customer_signature: Option<Vec<u8>>,
}

/// A table row: label, value, label, value.
pub type SheetRow = [String; 4];

#[derive(Debug, Clone, PartialEq)]
pub struct AgreementSheet {
    pub reference: String,
    pub title: &'static str,
    pub subtitle: String,
    pub dealer_role: &'static str,
    pub customer_role: &'static str,
    /// Sections 1 and 2, side by side
    pub parties: Vec<SheetRow>,
    /// Sections 3 and 4, side by side
    pub details: Vec<SheetRow>,
    pub terms: &'static [&'static str],
    /// Footer date, `August 14, 2024`
    pub generated: String,
}

fn or_na(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        "N/A".to_string()
    } else {
        value.to_string()
    }
}

fn row(a: &str, b: String, c: &str, d: String) -> SheetRow {
    [a.to_string(), b, c.to_string(), d]
}

impl AgreementSheet {
    pub fn build(
        agreement: &agreement::Model,
        phone: &phone::Model,
        seller: &user::Model,
    ) -> Result<Self, DomainError> {
        let kind = agreement.kind()?;
        let created = NaiveDateTime::parse_from_str(&agreement.created_at, "%Y-%m-%d %H:%M:%S")
            .map_err(|_| {
                DomainError::Validation(format!(
                    "Invalid agreement date '{}'",
                    agreement.created_at
                ))
            })?;
        let reference = agreement.reference();
        let long_date = created.format("%B %d, %Y").to_string();

        let (title, dealer_role, customer_role, price_label, terms) = match kind {
            AgreementType::Buy => (
                "PHONE PURCHASE AGREEMENT",
                "DEALER (BUYER)",
                "CUSTOMER (SELLER)",
                "Purchase Price:",
                BUY_TERMS,
            ),
            AgreementType::Sell => (
                "PHONE SALES AGREEMENT",
                "DEALER (SELLER)",
                "CUSTOMER (BUYER)",
                "Selling Price:",
                SELL_TERMS,
            ),
        };

        let parties = vec![
            row("Full Name:", seller.full_name(), "Full Name:", or_na(&agreement.customer_name)),
            row(
                "National ID:",
                or_na(&seller.national_id),
                "National ID:",
                or_na(&agreement.customer_national_id),
            ),
            row(
                "Phone Number:",
                or_na(&seller.phone_number),
                "Phone Number:",
                or_na(&agreement.customer_phone),
            ),
            row(
                "Address/Location:",
                or_na(&seller.address),
                "Address/Location:",
                or_na(&agreement.customer_address),
            ),
        ];

        let details = vec![
            row(
                "Brand:",
                or_na(&phone.brand),
                "Date of Transaction:",
                created.format("%Y-%m-%d %H:%M").to_string(),
            ),
            row(
                "Model:",
                or_na(&phone.model_name),
                "Location of Transaction:",
                or_na(&seller.address),
            ),
            row("IMEI Number:", phone.imei.clone(), "Agreement Reference:", reference.clone()),
            row("Serial Number:", or_na(&phone.serial_number), "", String::new()),
            row(
                "Condition:",
                phone.condition()?.label().to_string(),
                "",
                String::new(),
            ),
            row(price_label, format_rwf(agreement.price), "", String::new()),
        ];

        Ok(Self {
            subtitle: format!("Agreement Reference: {} | Date: {}", reference, long_date),
            reference,
            title,
            dealer_role,
            customer_role,
            parties,
            details,
            terms,
            generated: long_date,
        })
    }
}

/// `Agreement_42_20240814.pdf`
pub fn filename(agreement: &agreement::Model) -> String {
    let day: String = agreement
        .created_at
        .chars()
        .take(10)
        .filter(|c| c.is_ascii_digit())
        .collect();
    format!("Agreement_{}_{}.pdf", agreement.id, day)
}

/// Greedy word wrap at `width` characters.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Rough Helvetica advance: half the font size per character, in millimetres.
fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.5 * 0.3528
}

struct Canvas {
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl Canvas {
    fn text(&self, text: &str, size: f32, x: f32, y: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(text, size, Mm(x), Mm(y), font);
    }

    fn text_right(&self, text: &str, size: f32, right: f32, y: f32, bold: bool) {
        self.text(text, size, right - text_width(text, size), y, bold);
    }

    fn text_centered(&self, text: &str, size: f32, center: f32, y: f32, bold: bool) {
        self.text(text, size, center - text_width(text, size) / 2.0, y, bold);
    }

    fn line(&self, x1: f32, y1: f32, x2: f32, y2: f32) {
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(x1), Mm(y1)), false),
                (Point::new(Mm(x2), Mm(y2)), false),
            ],
            is_closed: false,
        });
    }

    fn stroke(&self, rgb: (f32, f32, f32), thickness: f32) {
        self.layer
            .set_outline_color(Color::Rgb(Rgb::new(rgb.0, rgb.1, rgb.2, None)));
        self.layer.set_outline_thickness(thickness);
    }

    fn rect(&self, x: f32, top: f32, width: f32, height: f32) {
        self.line(x, top, x + width, top);
        self.line(x + width, top, x + width, top - height);
        self.line(x + width, top - height, x, top - height);
        self.line(x, top - height, x, top);
    }

    /// Fit an encoded image into a box whose top-left corner is `(x, top)`.
    /// Returns false when the bytes do not decode.
    fn image(&self, bytes: &[u8], x: f32, top: f32, max_w: f32, max_h: f32) -> bool {
        let decoded = match image_crate::load_from_memory(bytes) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!("Skipping undecodable image on agreement sheet: {}", e);
                return false;
            }
        };

        // Drops any alpha channel
        let rgb = decoded.to_rgb8();

        const DPI: f32 = 300.0;
        let natural_w = rgb.width() as f32 / DPI * 25.4;
        let natural_h = rgb.height() as f32 / DPI * 25.4;
        if natural_w <= 0.0 || natural_h <= 0.0 {
            return false;
        }
        let scale = (max_w / natural_w).min(max_h / natural_h);
        let (w, h) = (natural_w * scale, natural_h * scale);

        let rgb = image_crate::DynamicImage::ImageRgb8(rgb);
        Image::from_dynamic_image(&rgb).add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(x + (max_w - w) / 2.0)),
                translate_y: Some(Mm(top - max_h + (max_h - h) / 2.0)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(DPI),
                ..Default::default()
            },
        );
        true
    }
}

const BLACK: (f32, f32, f32) = (0.0, 0.0, 0.0);
const BLUE: (f32, f32, f32) = (0.145, 0.388, 0.922);

fn draw_header(canvas: &Canvas, sheet: &AgreementSheet) {
    let right = PAGE_WIDTH - MARGIN;
    canvas.text_right("PHONE AGREEMENT", 16.0, right, PAGE_HEIGHT - 15.9, true);
    canvas.text_right("MANAGEMENT SYSTEM", 11.0, right, PAGE_HEIGHT - 21.2, false);
    canvas.text_right(&format!("Ref: {}", sheet.reference), 9.0, right, PAGE_HEIGHT - 26.5, false);

    canvas.stroke(BLUE, 2.0);
    canvas.line(MARGIN, PAGE_HEIGHT - 30.0, right, PAGE_HEIGHT - 30.0);
}

fn draw_footer(canvas: &Canvas, sheet: &AgreementSheet) {
    canvas.stroke(BLACK, 1.0);
    canvas.line(MARGIN, 15.9, PAGE_WIDTH - MARGIN, 15.9);
    canvas.text("This is a legally binding agreement", 7.0, MARGIN, 11.3, false);
    canvas.text_centered(
        &format!("Generated: {}", sheet.generated),
        7.0,
        PAGE_WIDTH / 2.0,
        11.3,
        false,
    );
    canvas.text_right("Page 1", 7.0, PAGE_WIDTH - MARGIN, 11.3, false);
}

/// Draw one two-section block of the details table. Returns the y below it.
fn draw_block(canvas: &Canvas, top: f32, headers: [String; 2], rows: &[SheetRow]) -> f32 {
    let half = COLUMNS[0] + COLUMNS[1];
    let height = ROW_HEIGHT * (rows.len() + 1) as f32;

    canvas.stroke(BLACK, 0.7);
    canvas.rect(MARGIN, top, CONTENT_WIDTH, height);
    canvas.line(MARGIN + half, top, MARGIN + half, top - height);

    canvas.text(&headers[0], 8.0, MARGIN + 1.0, top - ROW_HEIGHT + 1.5, true);
    canvas.text(&headers[1], 8.0, MARGIN + half + 1.0, top - ROW_HEIGHT + 1.5, true);

    for (i, cells) in rows.iter().enumerate() {
        let row_top = top - ROW_HEIGHT * (i + 1) as f32;
        canvas.line(MARGIN, row_top, MARGIN + CONTENT_WIDTH, row_top);

        let mut x = MARGIN;
        for (col, cell) in cells.iter().enumerate() {
            let bold = col % 2 == 0;
            canvas.text(cell, BODY_SIZE, x + 1.0, row_top - ROW_HEIGHT + 1.5, bold);
            x += COLUMNS[col];
        }
    }
    top - height
}

fn draw_media(canvas: &Canvas, top: f32, images: &SheetImages) -> f32 {
    let half = CONTENT_WIDTH / 2.0;
    let photo_h = 38.1;
    let caption_h = ROW_HEIGHT;
    let signature_h = 20.3;
    let height = photo_h + caption_h + signature_h + caption_h;

    canvas.stroke(BLACK, 0.7);
    canvas.rect(MARGIN, top, CONTENT_WIDTH, height);
    canvas.line(MARGIN + half, top, MARGIN + half, top - height);
    for y in [
        top - photo_h,
        top - photo_h - caption_h,
        top - photo_h - caption_h - signature_h,
    ] {
        canvas.line(MARGIN, y, MARGIN + CONTENT_WIDTH, y);
    }

    let left_center = MARGIN + half / 2.0;
    let right_center = MARGIN + half + half / 2.0;

    // Photos
    let placed = images
        .id_photo
        .as_deref()
        .is_some_and(|bytes| canvas.image(bytes, MARGIN + 2.0, top - 1.0, half - 4.0, photo_h - 2.0));
    if !placed {
        canvas.text_centered("(Not Available)", BODY_SIZE, left_center, top - photo_h / 2.0, false);
    }
    canvas.text_centered("(Placeholder)", BODY_SIZE, right_center, top - photo_h / 2.0, false);

    let caption_y = top - photo_h - caption_h + 1.5;
    canvas.text_centered("ID Photo", BODY_SIZE, left_center, caption_y, true);
    canvas.text_centered("Passport Photo", BODY_SIZE, right_center, caption_y, true);

    // Signatures
    let sig_top = top - photo_h - caption_h;
    let blank = "_".repeat(30);
    for (bytes, center, left) in [
        (images.seller_signature.as_deref(), left_center, MARGIN),
        (images.customer_signature.as_deref(), right_center, MARGIN + half),
    ] {
        let placed = bytes.is_some_and(|bytes| {
            canvas.image(bytes, left + 2.0, sig_top - 1.0, half - 4.0, signature_h - 2.0)
        });
        if !placed {
            canvas.text_centered(&blank, BODY_SIZE, center, sig_top - signature_h / 2.0, false);
        }
    }

    let caption_y = sig_top - signature_h - caption_h + 1.5;
    canvas.text_centered("Seller Signature", BODY_SIZE, left_center, caption_y, true);
    canvas.text_centered("Customer Signature", BODY_SIZE, right_center, caption_y, true);

    top - height
}

fn draw_terms(canvas: &Canvas, top: f32, terms: &[&str]) {
    let lines: Vec<String> = terms
        .iter()
        .flat_map(|paragraph| wrap(paragraph, TERMS_WRAP))
        .collect();
    let line_h = 3.0;
    let height = 8.0 + line_h * lines.len() as f32 + 2.0;

    canvas.stroke(BLACK, 1.5);
    canvas.rect(MARGIN, top, CONTENT_WIDTH, height);
    canvas.text_centered("TERMS AND CONDITIONS", 8.0, PAGE_WIDTH / 2.0, top - 5.0, true);

    for (i, line) in lines.iter().enumerate() {
        canvas.text(line, 6.0, MARGIN + 3.0, top - 9.0 - line_h * i as f32, false);
    }
}

/// Lay the sheet out on a letter page and return the PDF bytes.
pub fn render_pdf(sheet: &AgreementSheet, images: &SheetImages) -> Result<Vec<u8>, String> {
    let (doc, page, layer) = PdfDocument::new(
        sheet.title,
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "Agreement",
    );
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| e.to_string())?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| e.to_string())?;
    let canvas = Canvas {
        layer: doc.get_page(page).get_layer(layer),
        regular,
        bold,
    };

    draw_header(&canvas, sheet);

    let mut y = PAGE_HEIGHT - 40.0;
    canvas.text_centered(sheet.title, 14.0, PAGE_WIDTH / 2.0, y, true);
    y -= 5.5;
    canvas.text_centered(&sheet.subtitle, 8.0, PAGE_WIDTH / 2.0, y, false);
    y -= 4.0;

    y = draw_block(
        &canvas,
        y,
        [
            format!("1. {}", sheet.dealer_role),
            format!("2. {}", sheet.customer_role),
        ],
        &sheet.parties,
    );
    y = draw_block(
        &canvas,
        y,
        [
            "3. PHONE DETAILS".to_string(),
            "4. AGREEMENT DETAILS".to_string(),
        ],
        &sheet.details,
    );
    y = draw_media(&canvas, y - 2.0, images);
    draw_terms(&canvas, y - 2.0, sheet.terms);

    draw_footer(&canvas, sheet);
    drop(canvas);

    doc.save_to_bytes().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn fixtures(kind: &str) -> (agreement::Model, phone::Model, user::Model) {
        let agreement = agreement::Model {
            id: 42,
            agreement_type: kind.to_string(),
            phone_id: 7,
            seller_id: 3,
            customer_name: "Jean Mugisha".to_string(),
            customer_national_id: "1199080012345678".to_string(),
            customer_phone: "+250788123456".to_string(),
            customer_address: String::new(),
            id_photo: None,
            passport_photo: None,
            signature: String::new(),
            signature_photo: None,
            price: dec!(150000),
            notes: String::new(),
            created_at: "2024-08-14 09:30:00".to_string(),
        };
        let phone = phone::Model {
            id: 7,
            imei: "356938035643809".to_string(),
            serial_number: String::new(),
            brand: "Samsung".to_string(),
            model_name: "Galaxy A14".to_string(),
            color: "Black".to_string(),
            condition: "used".to_string(),
            status: "available".to_string(),
            purchase_price: Some(dec!(120000)),
            current_owner_id: 3,
            created_at: "2024-08-14 09:30:00".to_string(),
            updated_at: "2024-08-14 09:30:00".to_string(),
        };
        let seller = user::Model {
            id: 3,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: String::new(),
            role: Some("seller".to_string()),
            is_superuser: false,
            first_name: "Alice".to_string(),
            last_name: "Uwase".to_string(),
            phone_number: "+250788000111".to_string(),
            address: "Kigali".to_string(),
            national_id: "1199570012345678".to_string(),
            signature: None,
            is_suspended: false,
            suspended_at: None,
            suspended_reason: String::new(),
            suspended_by: None,
            date_joined: "2024-01-01 00:00:00".to_string(),
            updated_at: "2024-01-01 00:00:00".to_string(),
        };
        (agreement, phone, seller)
    }

    #[test]
    fn test_sell_sheet_roles_and_rows() {
        let (agreement, phone, seller) = fixtures("sell");
        let sheet = AgreementSheet::build(&agreement, &phone, &seller).unwrap();

        assert_eq!(sheet.title, "PHONE SALES AGREEMENT");
        assert_eq!(sheet.dealer_role, "DEALER (SELLER)");
        assert_eq!(sheet.customer_role, "CUSTOMER (BUYER)");
        assert_eq!(sheet.reference, "AGR-000042");
        assert_eq!(
            sheet.subtitle,
            "Agreement Reference: AGR-000042 | Date: August 14, 2024"
        );
        assert_eq!(sheet.parties[0][1], "Alice Uwase");
        assert_eq!(sheet.parties[3][3], "N/A");
        assert_eq!(sheet.details[0][3], "2024-08-14 09:30");
        assert_eq!(sheet.details[3][1], "N/A");
        assert_eq!(sheet.details[4][1], "Used");
        assert_eq!(sheet.details[5][0], "Selling Price:");
        assert_eq!(sheet.details[5][1], "RWF 150,000.00");
    }

    #[test]
    fn test_buy_sheet_swaps_roles() {
        let (agreement, phone, seller) = fixtures("buy");
        let sheet = AgreementSheet::build(&agreement, &phone, &seller).unwrap();

        assert_eq!(sheet.title, "PHONE PURCHASE AGREEMENT");
        assert_eq!(sheet.dealer_role, "DEALER (BUYER)");
        assert_eq!(sheet.customer_role, "CUSTOMER (SELLER)");
        assert!(sheet.terms[0].contains("undersigned seller"));
    }

    #[test]
    fn test_unparseable_date_is_rejected() {
        let (mut agreement, phone, seller) = fixtures("sell");
        agreement.created_at = "yesterday".to_string();
        assert!(AgreementSheet::build(&agreement, &phone, &seller).is_err());
    }

    #[test]
    fn test_filename_uses_creation_day() {
        let (agreement, _, _) = fixtures("sell");
        assert_eq!(filename(&agreement), "Agreement_42_20240814.pdf");
    }

    #[test]
    fn test_wrap_respects_width() {
        let lines = wrap("one two three four five", 9);
        assert_eq!(lines, vec!["one two", "three", "four five"]);
        assert!(wrap("", 10).is_empty());
    }

    #[test]
    fn test_render_produces_pdf_bytes() {
        let (agreement, phone, seller) = fixtures("sell");
        let sheet = AgreementSheet::build(&agreement, &phone, &seller).unwrap();
        let images = SheetImages {
            customer_signature: Some(b"not an image".to_vec()),
            ..Default::default()
        };
        let bytes = render_pdf(&sheet, &images).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
