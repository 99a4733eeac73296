//! 案件查询参数
//!
//! 入站请求先以 `CaseQueryRequest` 原样接收，校验通过后才成为不可变的 `CaseQuery`

use std::fmt::Display;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// 门户最早可查的登记年份
pub const MIN_YEAR: i64 = 1950;
const MAX_CASE_TYPE_LEN: usize = 200;
const MAX_CASE_NUMBER_DIGITS: usize = 10;

/// 年份字段，接受数字或数字字符串
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum YearField {
    Number(i64),
    Text(String),
}

/// 未校验的入站请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaseQueryRequest {
    #[serde(default)]
    pub case_type: Option<String>,
    #[serde(default)]
    pub case_number: Option<String>,
    #[serde(default)]
    pub year: Option<YearField>,
}

impl CaseQueryRequest {
    pub fn new(
        case_type: impl Into<String>,
        case_number: impl Into<String>,
        year: impl Into<String>,
    ) -> Self {
        Self {
            case_type: Some(case_type.into()),
            case_number: Some(case_number.into()),
            year: Some(YearField::Text(year.into())),
        }
    }
}

/// 校验后的案件查询
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseQuery {
    case_type: String,
    case_number: String,
    year: u16,
}

impl CaseQuery {
    pub fn case_type(&self) -> &str {
        &self.case_type
    }

    pub fn case_number(&self) -> &str {
        &self.case_number
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    /// 案件类型的简称（下拉框文本 " - " 之前的部分），用于日志
    pub fn short_type(&self) -> &str {
        self.case_type
            .split(" - ")
            .next()
            .unwrap_or(&self.case_type)
            .trim()
    }

    /// 下载文件名
    pub fn report_file_name(&self) -> String {
        format!("Case_{}_{}.pdf", self.case_number, self.year)
    }
}

impl TryFrom<CaseQueryRequest> for CaseQuery {
    type Error = AppError;

    fn try_from(request: CaseQueryRequest) -> AppResult<Self> {
        let case_type = request
            .case_type
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::invalid_query("缺少 case_type"))?;
        if case_type.chars().count() > MAX_CASE_TYPE_LEN {
            return Err(AppError::invalid_query(format!(
                "case_type 超过 {} 个字符",
                MAX_CASE_TYPE_LEN
            )));
        }

        let case_number = request
            .case_number
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::invalid_query("缺少 case_number"))?;
        if case_number.len() > MAX_CASE_NUMBER_DIGITS
            || !case_number.chars().all(|c| c.is_ascii_digit())
        {
            return Err(AppError::invalid_query(format!(
                "case_number 必须是 1-{} 位数字: {}",
                MAX_CASE_NUMBER_DIGITS, case_number
            )));
        }

        let year = match request.year {
            Some(YearField::Number(n)) => n,
            Some(YearField::Text(text)) => text
                .trim()
                .parse::<i64>()
                .map_err(|_| AppError::invalid_query(format!("year 不是数字: {}", text)))?,
            None => return Err(AppError::invalid_query("缺少 year")),
        };
        let current_year = i64::from(chrono::Local::now().year());
        if !(MIN_YEAR..=current_year).contains(&year) {
            return Err(AppError::invalid_query(format!(
                "year 必须在 {}-{} 之间: {}",
                MIN_YEAR, current_year, year
            )));
        }

        Ok(Self {
            case_type,
            case_number,
            // 范围已检查
            year: year as u16,
        })
    }
}

impl Display for CaseQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}/{}", self.short_type(), self.case_number, self.year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const CRIMINAL_APPEAL: &str = "Cr.A(SJ) - CRIMINAL APPEAL (SINGLE JUDGE)(24)";

    #[test]
    fn accepts_well_formed_query() {
        let query = CaseQuery::try_from(CaseQueryRequest::new(CRIMINAL_APPEAL, "460", "2006"))
            .unwrap();
        assert_eq!(query.case_type(), CRIMINAL_APPEAL);
        assert_eq!(query.case_number(), "460");
        assert_eq!(query.year(), 2006);
        assert_eq!(query.short_type(), "Cr.A(SJ)");
        assert_eq!(query.report_file_name(), "Case_460_2006.pdf");
        assert_eq!(query.to_string(), "Cr.A(SJ) 460/2006");
    }

    #[test]
    fn year_may_be_json_number_or_string() {
        let from_number: CaseQueryRequest = serde_json::from_str(
            r#"{"case_type":"WP","case_number":"12","year":2019}"#,
        )
        .unwrap();
        let from_text: CaseQueryRequest = serde_json::from_str(
            r#"{"case_type":"WP","case_number":"12","year":"2019"}"#,
        )
        .unwrap();
        assert_eq!(CaseQuery::try_from(from_number).unwrap().year(), 2019);
        assert_eq!(CaseQuery::try_from(from_text).unwrap().year(), 2019);
    }

    #[test]
    fn rejects_missing_fields() {
        let err = CaseQuery::try_from(CaseQueryRequest::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidQuery);

        let mut request = CaseQueryRequest::new(CRIMINAL_APPEAL, "460", "2006");
        request.case_number = Some("   ".to_string());
        assert_eq!(
            CaseQuery::try_from(request).unwrap_err().kind(),
            ErrorKind::InvalidQuery
        );
    }

    #[test]
    fn rejects_non_numeric_case_number() {
        let err = CaseQuery::try_from(CaseQueryRequest::new(CRIMINAL_APPEAL, "46O", "2006"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidQuery);
    }

    #[test]
    fn rejects_out_of_range_year() {
        for year in ["1949", "3000", "two thousand"] {
            let err = CaseQuery::try_from(CaseQueryRequest::new(CRIMINAL_APPEAL, "460", year))
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidQuery, "year {}", year);
        }
    }
}
