/// 单次验证码尝试
///
/// 每轮重试新建一个，循环结束后丢弃；`guessed_text` 只对本轮的 `image` 有效
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptchaAttempt {
    /// 第几次尝试（从 1 开始）
    pub number: usize,
    pub image: Vec<u8>,
    pub guessed_text: String,
    pub accepted: bool,
}

impl CaptchaAttempt {
    pub fn new(number: usize, image: Vec<u8>, guessed_text: String) -> Self {
        Self {
            number,
            image,
            guessed_text,
            accepted: false,
        }
    }
}
