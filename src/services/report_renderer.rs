//! PDF 报告渲染服务 - 业务能力层
//!
//! 把 CaseRecord 排版成 A4 报告，输出内存中的 PDF 字节。
//! 不写时间戳、不生成随机 ID，同一记录总是得到相同字节

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::{CaseRecord, Fields, SectionContent, Table};

pub const REPORT_TITLE: &str = "eCourts Case Status Report";
const NO_RECORDS: &str = "No records found.";

// ========== 版面常量（单位 pt）==========

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 28.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const HEADER_BOTTOM: f32 = PAGE_HEIGHT - 60.0;
const FOOTER_TOP: f32 = 40.0;

const TITLE_SIZE: f32 = 15.0;
const SECTION_SIZE: f32 = 12.0;
const BODY_SIZE: f32 = 9.5;
const LINE_HEIGHT: f32 = 13.0;
const CELL_PADDING: f32 = 3.0;
/// 键列宽 60mm
const KEY_WIDTH: f32 = 170.0;

const SECTION_FILL: [f32; 3] = [200.0 / 255.0, 220.0 / 255.0, 1.0];
const TABLE_HEADER_FILL: [f32; 3] = [240.0 / 255.0; 3];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
    Italic,
}

impl Font {
    const ALL: [Font; 3] = [Font::Regular, Font::Bold, Font::Italic];

    fn resource_name(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
            Font::Italic => "F3",
        }
    }

    fn base_font(self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
            Font::Italic => "Helvetica-Oblique",
        }
    }
}

/// PDF 报告渲染器
#[derive(Debug, Default, Clone, Copy)]
pub struct ReportRenderer;

impl ReportRenderer {
    pub fn new() -> Self {
        Self
    }

    /// 渲染整份报告
    pub fn render(&self, record: &CaseRecord) -> AppResult<Vec<u8>> {
        let mut layout = Layout::new();
        for (name, content) in record.sections() {
            layout.section_header(name);
            match content {
                SectionContent::Fields(fields) => layout.fields(fields),
                SectionContent::Table(table) => layout.table(table),
                SectionContent::Text(text) => layout.text_block(text),
            }
            layout.gap(6.0);
        }
        let pages = layout.finish();
        debug!("报告排版完成: {} 页", pages.len());
        assemble(pages)
    }
}

// ========== 文本处理 ==========

/// 转成 WinAnsi 字节，无法表示的字符写成 '?'
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}' => c as u8,
            '\t' => b' ',
            _ => b'?',
        })
        .collect()
}

/// Helvetica 字宽的近似值（千分之一 em）
fn char_width(c: char) -> f32 {
    match c {
        ' ' | '.' | ',' | ':' | ';' | '\'' | '!' | '|' | 'i' | 'j' | 'l' => 278.0,
        '(' | ')' | '-' | '/' | 'f' | 't' | 'r' | 'I' => 333.0,
        'm' | 'M' | 'W' => 833.0,
        'w' => 722.0,
        c if c.is_ascii_digit() => 556.0,
        c if c.is_ascii_uppercase() => 667.0,
        _ => 556.0,
    }
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().map(char_width).sum::<f32>() * size / 1000.0
}

/// 按宽度折行；保留原有换行，超长单词按字符硬切
fn wrap(text: &str, width: f32, size: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if line.is_empty() {
                word.to_string()
            } else {
                format!("{line} {word}")
            };
            if text_width(&candidate, size) <= width {
                line = candidate;
                continue;
            }
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            for c in word.chars() {
                if !line.is_empty() && text_width(&format!("{line}{c}"), size) > width {
                    lines.push(std::mem::take(&mut line));
                }
                line.push(c);
            }
        }
        lines.push(line);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

// ========== 排版 ==========

/// 一整页正文区最多容纳的行数
fn lines_per_page() -> usize {
    ((HEADER_BOTTOM - FOOTER_TOP - 2.0 * CELL_PADDING) / LINE_HEIGHT) as usize
}

struct Cell<'a> {
    width: f32,
    lines: &'a [String],
    font: Font,
    fill: Option<[f32; 3]>,
}

/// 逐页累积绘制指令，纵向游标从页顶向下走
struct Layout {
    pages: Vec<Vec<Operation>>,
    ops: Vec<Operation>,
    cursor: f32,
}

impl Layout {
    fn new() -> Self {
        let mut layout = Self {
            pages: Vec::new(),
            ops: Vec::new(),
            cursor: HEADER_BOTTOM,
        };
        layout.page_header();
        layout
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        self.page_footer();
        self.pages.push(self.ops);
        self.pages
    }

    fn page_header(&mut self) {
        let width = text_width(REPORT_TITLE, TITLE_SIZE);
        self.text(
            (PAGE_WIDTH - width) / 2.0,
            PAGE_HEIGHT - MARGIN - TITLE_SIZE,
            Font::Bold,
            TITLE_SIZE,
            REPORT_TITLE,
        );
        self.cursor = HEADER_BOTTOM;
    }

    fn page_footer(&mut self) {
        let label = format!("Page {}", self.pages.len() + 1);
        let width = text_width(&label, 8.0);
        self.text((PAGE_WIDTH - width) / 2.0, 20.0, Font::Italic, 8.0, &label);
    }

    fn new_page(&mut self) {
        self.page_footer();
        let ops = std::mem::take(&mut self.ops);
        self.pages.push(ops);
        self.page_header();
    }

    fn remaining(&self) -> f32 {
        self.cursor - FOOTER_TOP
    }

    fn ensure_space(&mut self, height: f32) {
        if height > self.remaining() {
            self.new_page();
        }
    }

    fn gap(&mut self, height: f32) {
        self.cursor -= height;
    }

    // ---------- 绘制原语 ----------

    fn text(&mut self, x: f32, y: f32, font: Font, size: f32, text: &str) {
        self.ops.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![font.resource_name().into(), Object::Real(size)],
            ),
            Operation::new("Td", vec![Object::Real(x), Object::Real(y)]),
            Operation::new(
                "Tj",
                vec![Object::String(win_ansi(text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]);
    }

    fn rect(&mut self, x: f32, top: f32, width: f32, height: f32, fill: Option<[f32; 3]>) {
        let bounds = vec![
            Object::Real(x),
            Object::Real(top - height),
            Object::Real(width),
            Object::Real(height),
        ];
        if let Some([r, g, b]) = fill {
            self.ops.extend([
                Operation::new("rg", vec![Object::Real(r), Object::Real(g), Object::Real(b)]),
                Operation::new("re", bounds.clone()),
                Operation::new("f", vec![]),
                Operation::new("g", vec![Object::Real(0.0)]),
            ]);
        }
        self.ops.extend([
            Operation::new("w", vec![Object::Real(0.5)]),
            Operation::new("re", bounds),
            Operation::new("S", vec![]),
        ]);
    }

    /// 当前页还能放下的行数
    fn lines_that_fit(&self) -> usize {
        ((self.remaining() - 2.0 * CELL_PADDING) / LINE_HEIGHT)
            .floor()
            .max(0.0) as usize
    }

    /// 一行若干单元格，行高取最高的单元格
    ///
    /// 超过一整页的单元格按页切块续画，不丢内容
    fn row(&mut self, cells: &[Cell<'_>]) {
        let tallest = cells
            .iter()
            .map(|c| c.lines.len())
            .max()
            .unwrap_or(0)
            .max(1);
        let page_lines = lines_per_page();
        let mut start = 0;
        while start < tallest {
            let rest = tallest - start;
            let fit = self.lines_that_fit();
            // 新页放得下的行不在页尾拆开
            if fit == 0 || (fit < rest && rest <= page_lines) {
                self.new_page();
                continue;
            }
            let take = fit.min(rest);
            self.row_chunk(cells, start, take);
            start += take;
        }
    }

    fn row_chunk(&mut self, cells: &[Cell<'_>], start: usize, lines: usize) {
        let height = lines as f32 * LINE_HEIGHT + 2.0 * CELL_PADDING;
        let top = self.cursor;
        let mut x = MARGIN;
        for cell in cells {
            self.rect(x, top, cell.width, height, cell.fill);
            for (i, line) in cell.lines.iter().skip(start).take(lines).enumerate() {
                let baseline = top - CELL_PADDING - (i as f32 + 1.0) * LINE_HEIGHT + 3.0;
                self.text(x + CELL_PADDING, baseline, cell.font, BODY_SIZE, line);
            }
            x += cell.width;
        }
        self.cursor -= height;
    }

    // ---------- 分区 ----------

    fn section_header(&mut self, name: &str) {
        let height = SECTION_SIZE + 2.0 * CELL_PADDING + 4.0;
        // 标题栏后面至少还能放一行内容
        self.ensure_space(height + LINE_HEIGHT + 2.0 * CELL_PADDING);
        let top = self.cursor;
        self.rect(MARGIN, top, CONTENT_WIDTH, height, Some(SECTION_FILL));
        self.text(
            MARGIN + CELL_PADDING,
            top - height + CELL_PADDING + 3.0,
            Font::Bold,
            SECTION_SIZE,
            name,
        );
        self.cursor -= height + 2.0;
    }

    fn no_records(&mut self) {
        self.ensure_space(LINE_HEIGHT);
        let baseline = self.cursor - LINE_HEIGHT + 3.0;
        self.text(MARGIN + CELL_PADDING, baseline, Font::Italic, BODY_SIZE, NO_RECORDS);
        self.cursor -= LINE_HEIGHT;
    }

    fn fields(&mut self, fields: &Fields) {
        if fields.is_empty() {
            self.no_records();
            return;
        }
        let value_width = CONTENT_WIDTH - KEY_WIDTH;
        for (key, value) in fields.iter() {
            let key_lines = wrap(key, KEY_WIDTH - 2.0 * CELL_PADDING, BODY_SIZE);
            let value_lines = wrap(value, value_width - 2.0 * CELL_PADDING, BODY_SIZE);
            self.row(&[
                Cell {
                    width: KEY_WIDTH,
                    lines: &key_lines,
                    font: Font::Bold,
                    fill: None,
                },
                Cell {
                    width: value_width,
                    lines: &value_lines,
                    font: Font::Regular,
                    fill: None,
                },
            ]);
        }
    }

    fn table(&mut self, table: &Table) {
        if table.headers.is_empty() || table.is_empty() {
            self.no_records();
            return;
        }
        let width = CONTENT_WIDTH / table.headers.len() as f32;
        let inner = width - 2.0 * CELL_PADDING;

        let header_lines: Vec<Vec<String>> = table
            .headers
            .iter()
            .map(|h| wrap(h, inner, BODY_SIZE))
            .collect();
        let header_cells: Vec<Cell<'_>> = header_lines
            .iter()
            .map(|lines| Cell {
                width,
                lines,
                font: Font::Bold,
                fill: Some(TABLE_HEADER_FILL),
            })
            .collect();
        self.row(&header_cells);

        for row in &table.rows {
            let row_lines: Vec<Vec<String>> =
                row.iter().map(|v| wrap(v, inner, BODY_SIZE)).collect();
            let cells: Vec<Cell<'_>> = row_lines
                .iter()
                .map(|lines| Cell {
                    width,
                    lines,
                    font: Font::Regular,
                    fill: None,
                })
                .collect();
            self.row(&cells);
        }
    }

    /// 长文本占满整行宽度，跨页由 row 负责
    fn text_block(&mut self, text: &str) {
        if text.trim().is_empty() {
            self.no_records();
            return;
        }
        let lines = wrap(text, CONTENT_WIDTH - 2.0 * CELL_PADDING, BODY_SIZE);
        self.row(&[Cell {
            width: CONTENT_WIDTH,
            lines: &lines,
            font: Font::Regular,
            fill: None,
        }]);
    }
}

// ========== 组装文档 ==========

fn assemble(pages: Vec<Vec<Operation>>) -> AppResult<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut font_dict = lopdf::Dictionary::new();
    for font in Font::ALL {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        font_dict.set(font.resource_name(), Object::Reference(font_id));
    }
    let resources_id = doc.add_object(dictionary! {
        "Font" => font_dict,
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations }
            .encode()
            .map_err(|e| AppError::Render(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(lopdf::Dictionary::new(), content));
        let page_id: ObjectId = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "Contents" => Object::Reference(content_id),
            "Resources" => Object::Reference(resources_id),
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(PAGE_WIDTH),
                Object::Real(PAGE_HEIGHT),
            ],
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(count),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(REPORT_TITLE),
        "Producer" => Object::string_literal(env!("CARGO_PKG_NAME")),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc.trailer.set("Info", Object::Reference(info_id));

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| AppError::Render(e.to_string()))?;
    Ok(output)
}
