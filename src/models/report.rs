/// 生成的 PDF 报告（内存中，不落盘）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Report {
    pub const CONTENT_TYPE: &'static str = "application/pdf";

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
