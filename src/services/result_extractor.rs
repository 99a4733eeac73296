//! 结果页解析服务 - 业务能力层
//!
//! 按结构（带类名的表格、带标签的单元格）从结果页 HTML 中取字段，构建 CaseRecord。
//! 可选分区缺失时留空；CNR 缺失说明拿到的不是案件详情页，直接报 MalformedPage

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::{CaseRecord, Fields, Table};

/// 结果页解析器
#[derive(Debug, Default, Clone, Copy)]
pub struct ResultExtractor;

impl ResultExtractor {
    pub fn new() -> Self {
        Self
    }

    /// 解析结果页 HTML
    pub fn extract(&self, html: &str) -> AppResult<CaseRecord> {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let record = CaseRecord {
            case_details: case_details(root),
            case_status: case_status(root),
            petitioner_and_advocate: text_block(root, "span.Petitioner_Advocate_table"),
            respondent_and_advocate: text_block(root, "span.Respondent_Advocate_table"),
            acts: header_table(root, "table.Acts_table", " "),
            subordinate_court: select_all(root, "span.Lower_court_table")
                .first()
                .map(|span| keyed_labels(*span))
                .unwrap_or_default(),
            fir_details: fir_details(root),
            ia_details: header_table(root, "table.IAheading", " "),
            orders: order_table(root),
            category_details: category_details(root),
        };

        if record.cnr_number().map_or(true, str::is_empty) {
            return Err(AppError::malformed_page("结果页缺少 CNR Number"));
        }

        debug!(
            "解析完成: CNR {:?}, {} 条法令, {} 条 FIR, {} 条 IA, {} 条裁定",
            record.cnr_number(),
            record.acts.rows.len(),
            record.fir_details.rows.len(),
            record.ia_details.rows.len(),
            record.orders.rows.len()
        );
        Ok(record)
    }
}

// ========== 文本辅助 ==========

fn clean_text(text: &str) -> String {
    text.replace('\u{a0}', " ").trim().to_string()
}

/// 元素内所有非空文本节点，用 `sep` 连接
fn joined_text(element: ElementRef<'_>, sep: &str) -> String {
    element
        .text()
        .map(clean_text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

fn strip_colon(text: &str) -> String {
    text.trim_start_matches(':').trim().to_string()
}

fn select_all<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => scope.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

fn nearest_ancestor<'a>(
    element: ElementRef<'a>,
    matches: impl Fn(ElementRef<'a>) -> bool,
) -> Option<ElementRef<'a>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| matches(*e))
}

fn next_sibling_named<'a>(element: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    element
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == name)
}

// ========== 各分区 ==========

/// 包含 `label_text` 的 label 所在的那一行 `span.case_details_table` 的文本
fn labelled_row(root: ElementRef<'_>, label_text: &str) -> Option<String> {
    select_all(root, "label")
        .into_iter()
        .filter(|label| joined_text(*label, " ").contains(label_text))
        .find_map(|label| {
            nearest_ancestor(label, |e| {
                e.value().name() == "span" && has_class(e, "case_details_table")
            })
        })
        .map(|row| joined_text(row, " "))
}

/// "A : x B : y" 拆成 (x, y)，不区分大小写
fn split_pair(text: &str, first: &str, second: &str) -> Option<(String, String)> {
    let pattern = format!(
        r"(?i){}\s*:\s*(.*?)\s*{}\s*:\s*(.*)",
        regex::escape(first),
        regex::escape(second)
    );
    let captures = Regex::new(&pattern).ok()?.captures(text)?;
    Some((
        captures.get(1)?.as_str().trim().to_string(),
        captures.get(2)?.as_str().trim().to_string(),
    ))
}

fn value_after_colon(text: &str) -> Option<String> {
    text.split_once(':').map(|(_, value)| value.trim().to_string())
}

fn case_details(root: ElementRef<'_>) -> Fields {
    let mut details = Fields::new();

    if let Some(value) = labelled_row(root, "Case Type").as_deref().and_then(value_after_colon) {
        details.insert("Case Type", value);
    }

    for (label, date_label, fallback) in [
        ("Filing Number", "Filing Date", "Filing Details"),
        ("Registration Number", "Registration Date", "Registration Details"),
    ] {
        if let Some(row) = labelled_row(root, label) {
            match split_pair(&row, label, date_label) {
                Some((number, date)) => {
                    details.insert(label, number);
                    details.insert(date_label, date);
                }
                None => details.insert(fallback, row),
            }
        }
    }

    if let Some(value) = labelled_row(root, CaseRecord::CNR_NUMBER)
        .as_deref()
        .and_then(value_after_colon)
    {
        details.insert(CaseRecord::CNR_NUMBER, value);
    }

    details
}

/// 黄色背景的状态块：每个 label 里两个 strong 分别是键和值
fn case_status(root: ElementRef<'_>) -> Fields {
    let mut status = Fields::new();
    let Some(block) = select_all(root, r#"div[style*="background-color:#FBF6D9"]"#)
        .into_iter()
        .next()
    else {
        return status;
    };
    for label in select_all(block, "label") {
        let strongs = select_all(label, "strong");
        if strongs.len() >= 2 {
            let key = joined_text(strongs[0], "");
            let value = strip_colon(&clean_text(&strongs[1].text().collect::<String>()));
            status.insert(key, value);
        }
    }
    status
}

fn text_block(root: ElementRef<'_>, css: &str) -> String {
    select_all(root, css)
        .first()
        .map(|e| joined_text(*e, "\n"))
        .unwrap_or_default()
}

/// 固定宽度的 span 是键，其后的 label 是值
fn keyed_labels(container: ElementRef<'_>) -> Fields {
    let mut fields = Fields::new();
    for key in select_all(container, r#"span[style*="width:150px"]"#) {
        if let Some(value) = next_sibling_named(key, "label") {
            fields.insert(joined_text(key, ""), strip_colon(&joined_text(value, "")));
        }
    }
    fields
}

fn cells(row: ElementRef<'_>, cell: &str, sep: &str) -> Vec<String> {
    select_all(row, cell)
        .into_iter()
        .map(|c| joined_text(c, sep))
        .collect()
}

/// th 作表头、其余行的 td 作数据
fn header_table(root: ElementRef<'_>, css: &str, cell_sep: &str) -> Table {
    let Some(table) = select_all(root, css).into_iter().next() else {
        return Table::default();
    };
    let headers = cells(table, "th", "");
    let mut result = Table::new(headers);
    for row in select_all(table, "tr").into_iter().skip(1) {
        result.push_row(cells(row, "td", cell_sep));
    }
    result
}

/// 裁定表没有 th，第一行 td 即表头
fn order_table(root: ElementRef<'_>) -> Table {
    let Some(table) = select_all(root, "table.order_table").into_iter().next() else {
        return Table::default();
    };
    let rows = select_all(table, "tr");
    let Some(header_row) = rows.first() else {
        return Table::default();
    };
    let mut result = Table::new(cells(*header_row, "td", ""));
    for row in rows.iter().skip(1) {
        result.push_row(cells(*row, "td", ""));
    }
    result
}

/// FIR 有表格和 span 两种形式，span 形式转成单行表格
fn fir_details(root: ElementRef<'_>) -> Table {
    if let Some(table) = select_all(root, "table.FIR_details_table").into_iter().next() {
        let rows = select_all(table, "tr");
        let mut headers = cells(table, "th", "");
        if headers.is_empty() {
            if let Some(first) = rows.first() {
                headers = cells(*first, "td", "");
            }
        }
        // 无论表头来自 th 还是首行 td，第一行都不是数据
        let mut result = Table::new(headers);
        for row in rows.iter().skip(1) {
            result.push_row(cells(*row, "td", ""));
        }
        return result;
    }

    if let Some(span) = select_all(root, "span.FIR_details_table").into_iter().next() {
        let info = keyed_labels(span);
        if !info.is_empty() {
            let mut result = Table::new(info.iter().map(|(k, _)| k.to_string()).collect());
            result.push_row(info.iter().map(|(_, v)| v.to_string()).collect());
            return result;
        }
    }

    Table::default()
}

/// 标题 h2 所在表格的下一个兄弟表格里，每行前两列是键值
fn category_details(root: ElementRef<'_>) -> Fields {
    let mut fields = Fields::new();
    let header = select_all(root, "h2")
        .into_iter()
        .find(|h| joined_text(*h, " ").contains("Category Details"));
    let data_table = header
        .and_then(|h| nearest_ancestor(h, |e| e.value().name() == "table"))
        .and_then(|t| next_sibling_named(t, "table"));
    if let Some(table) = data_table {
        for row in select_all(table, "tr") {
            let cols = cells(row, "td", "");
            if cols.len() >= 2 {
                fields.insert(cols[0].clone(), cols[1].clone());
            }
        }
    }
    fields
}
