//! 注入页面的 JS 片段
//!
//! 参数统一经 `js_string` / serde_json 转成字面量后拼接

use crate::infrastructure::js_executor::js_string;

/// 截获 alert / confirm，改为写入 `window.__ecourtsDialogs`
pub const DIALOG_HOOK: &str = r#"
(() => {
    if (window.__ecourtsDialogHook) return true;
    window.__ecourtsDialogHook = true;
    const record = (m) => {
        window.__ecourtsDialogs = window.__ecourtsDialogs || [];
        window.__ecourtsDialogs.push(String(m));
    };
    window.alert = (m) => { record(m); };
    window.confirm = (m) => { record(m); return true; };
    return true;
})()
"#;

const VISIBLE_FN: &str =
    "(el) => !!el && !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length)";

pub fn is_visible(selector: &str) -> String {
    format!(
        "(() => {{ const visible = {}; return Array.from(document.querySelectorAll({})).some(visible); }})()",
        VISIBLE_FN,
        js_string(selector)
    )
}

/// 等待下拉框由 AJAX 填充后按文本片段选择
pub fn select_option(selector: &str, text_fragment: &str, poll_ms: u64) -> String {
    format!(
        r#"
(async () => {{
    const select = document.querySelector({selector});
    if (!select) return {{ found: false, option: null }};
    for (let i = 0; i < 10 && select.options.length <= 1; i++) {{
        await new Promise((r) => setTimeout(r, {poll_ms}));
    }}
    const fragment = {fragment};
    for (const option of select.options) {{
        if (option.text.includes(fragment)) {{
            select.value = option.value;
            select.dispatchEvent(new Event('change', {{ bubbles: true }}));
            return {{ found: true, option: option.text }};
        }}
    }}
    return {{ found: true, option: null }};
}})()
"#,
        selector = js_string(selector),
        fragment = js_string(text_fragment),
        poll_ms = poll_ms,
    )
}

pub fn fill(selector: &str, value: &str) -> String {
    format!(
        r#"
(() => {{
    const input = document.querySelector({selector});
    if (!input) return false;
    input.focus();
    input.value = '';
    input.value = {value};
    input.dispatchEvent(new Event('input', {{ bubbles: true }}));
    input.dispatchEvent(new Event('change', {{ bubbles: true }}));
    return true;
}})()
"#,
        selector = js_string(selector),
        value = js_string(value),
    )
}

pub fn click(selector: &str, text_fragment: Option<&str>) -> String {
    let fragment = text_fragment.map(js_string).unwrap_or_else(|| "null".to_string());
    format!(
        r#"
(() => {{
    const visible = {visible};
    const fragment = {fragment};
    for (const el of document.querySelectorAll({selector})) {{
        if (!visible(el)) continue;
        if (fragment !== null && !(el.innerText || el.value || '').includes(fragment)) continue;
        el.click();
        return true;
    }}
    return false;
}})()
"#,
        visible = VISIBLE_FN,
        fragment = fragment,
        selector = js_string(selector),
    )
}

/// 图片是否存在、是否加载完成
///
/// 顶层返回值不能是 null（CDP 会当成没有返回值），统一包一层对象
pub fn image_ready(selector: &str) -> String {
    format!(
        "(() => {{ const img = document.querySelector({}); return {{ found: !!img, ready: !!img && img.complete && img.naturalWidth > 0 }}; }})()",
        js_string(selector)
    )
}

/// 页面快照，同时清空已记录的对话框
pub fn snapshot(markers: &[&str]) -> String {
    let markers = serde_json::to_string(markers).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"
(() => {{
    const visible = {visible};
    const markers = {markers};
    const dialogs = window.__ecourtsDialogs || [];
    window.__ecourtsDialogs = [];
    return {{
        bodyText: document.body ? document.body.innerText : '',
        visibleMarkers: markers.filter((s) => Array.from(document.querySelectorAll(s)).some(visible)),
        dialogs: dialogs,
    }};
}})()
"#,
        visible = VISIBLE_FN,
        markers = markers,
    )
}

pub fn outer_html(selector: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelector({}); return {{ html: el ? el.outerHTML : null }}; }})()",
        js_string(selector)
    )
}
