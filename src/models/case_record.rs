//! 案件记录
//!
//! 一次成功抓取后构建，之后只读。各分区顺序固定，报告按 `sections()` 的顺序输出

use serde::Serialize;

/// 有序的键值对
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Fields(Vec<(String, String)>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加键值；同名键覆盖旧值并保留原位置
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}

/// 表格：表头 + 与表头等宽的行
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// 列数与表头不一致的行直接丢弃
    pub fn push_row(&mut self, row: Vec<String>) -> bool {
        if row.len() == self.headers.len() && !self.headers.is_empty() {
            self.rows.push(row);
            true
        } else {
            false
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// 分区内容
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionContent<'a> {
    Fields(&'a Fields),
    Table(&'a Table),
    Text(&'a str),
}

/// 案件记录
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CaseRecord {
    pub case_details: Fields,
    pub case_status: Fields,
    pub petitioner_and_advocate: String,
    pub respondent_and_advocate: String,
    pub acts: Table,
    pub subordinate_court: Fields,
    pub fir_details: Table,
    pub ia_details: Table,
    pub orders: Table,
    pub category_details: Fields,
}

impl CaseRecord {
    pub const CASE_DETAILS: &'static str = "Case Details";
    pub const CNR_NUMBER: &'static str = "CNR Number";

    pub fn cnr_number(&self) -> Option<&str> {
        self.case_details.get(Self::CNR_NUMBER)
    }

    /// 固定顺序的分区列表
    pub fn sections(&self) -> [(&'static str, SectionContent<'_>); 10] {
        [
            (Self::CASE_DETAILS, SectionContent::Fields(&self.case_details)),
            ("Case Status", SectionContent::Fields(&self.case_status)),
            (
                "Petitioner and Advocate",
                SectionContent::Text(&self.petitioner_and_advocate),
            ),
            (
                "Respondent and Advocate",
                SectionContent::Text(&self.respondent_and_advocate),
            ),
            ("Acts", SectionContent::Table(&self.acts)),
            (
                "Subordinate Court Information",
                SectionContent::Fields(&self.subordinate_court),
            ),
            ("FIR Details", SectionContent::Table(&self.fir_details)),
            ("IA Details", SectionContent::Table(&self.ia_details)),
            ("Orders", SectionContent::Table(&self.orders)),
            (
                "Category Details",
                SectionContent::Fields(&self.category_details),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_keep_insertion_order_and_overwrite_in_place() {
        let mut fields = Fields::new();
        fields.insert("Case Type", "CRA");
        fields.insert("CNR Number", "MPHC010001");
        fields.insert("Case Type", "Cr.A");
        let keys: Vec<_> = fields.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["Case Type", "CNR Number"]);
        assert_eq!(fields.get("Case Type"), Some("Cr.A"));
    }

    #[test]
    fn table_drops_ragged_rows() {
        let mut table = Table::new(vec!["Sr No".into(), "Date".into()]);
        assert!(table.push_row(vec!["1".into(), "01-01-2006".into()]));
        assert!(!table.push_row(vec!["2".into()]));
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn sections_start_with_case_details() {
        let record = CaseRecord::default();
        let names: Vec<_> = record.sections().iter().map(|(name, _)| *name).collect();
        assert_eq!(names[0], "Case Details");
        assert_eq!(names[6], "FIR Details");
        assert_eq!(names.len(), 10);
    }
}
