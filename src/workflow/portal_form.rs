//! 门户检索页的选择器与页面文本特征

/// 案件类型下拉框
pub const CASE_TYPE_SELECT: &str = "select[id='case_type'], select[name='case_type']";
pub const CASE_NUMBER_INPUT: &str = "input[id='search_case_no'], input[name='search_case_no']";
pub const YEAR_INPUT: &str = "input[id='rgyear'], input[name='rgyear']";

pub const CAPTCHA_IMAGE: &str = "img[id='captcha_image']";
pub const CAPTCHA_INPUT: &str = "input[id='captcha'], input[name='captcha']";
pub const CAPTCHA_REFRESH: &str = "img[alt='Refresh'], a[title='Refresh'], img[src*='refresh'], img[onclick*='captcha'], a[onclick*='captcha']";

pub const SUBMIT_BUTTON: &str = "input[type='submit'], input[value='Go'], button[type='submit']";

/// 出现任意一个即说明验证码已通过并进入结果页
pub const RESULT_MARKERS: [&str; 5] = [
    "#showList",
    "#show_filing_details",
    "#history_case_no",
    "#caseHistory",
    ".case_details_table",
];

/// 页面文本（小写）中出现即为验证码被拒
pub const REJECTION_PHRASES: [&str; 4] = [
    "invalid captcha",
    "wrong captcha",
    "does not match",
    "verification code",
];

/// 验证码已通过但门户查不到该案件
pub const NO_RECORD_PHRASES: [&str; 2] = ["record not found", "no records found"];

/// 结果列表中展开案件详情的链接
pub const VIEW_LINK: &str = "a";
pub const VIEW_LINK_TEXT: &str = "View";

/// 详情加载完成的标志
pub const DETAIL_READY: &str = "#caseHistory, #history_case_no, .case_details_table";

/// 读取 HTML 的区域，按顺序回退
pub const DETAIL_SOURCES: [&str; 2] = [
    "#secondpage, #caseHistory, #history_case_no",
    "#showList, #show_filing_details",
];
