// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库，locales/ 下维护 zh-CN（默认）、en、he
// 告警与校验信息的 kind/violation_type 为机器标签，message/reason 走翻译
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

/// 支持的语言
pub const SUPPORTED_LOCALES: &[&str] = &["zh-CN", "en", "he"];

/// 默认语言
pub const DEFAULT_LOCALE: &str = "zh-CN";

/// 语言环境变量
pub const LOCALE_ENV: &str = "GUIDE_ROSTER_LOCALE";

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 规范化语言代码（"en_US" → "en"，"zh" → "zh-CN"，"iw" → "he"）
pub fn normalize_locale(raw: &str) -> Option<&'static str> {
    let lower = raw.trim().to_lowercase().replace('_', "-");
    let primary = lower.split(['-', '.']).next().unwrap_or("");
    match primary {
        "zh" => Some("zh-CN"),
        "en" => Some("en"),
        "he" | "iw" => Some("he"),
        _ => None,
    }
}

/// 设置语言
///
/// # 返回
/// - true: 已切换
/// - false: 不支持的语言，保持不变
pub fn set_locale(locale: &str) -> bool {
    match normalize_locale(locale) {
        Some(code) => {
            rust_i18n::set_locale(code);
            true
        }
        None => {
            tracing::warn!(locale, "不支持的语言，保持当前语言");
            false
        }
    }
}

/// 从环境变量 GUIDE_ROSTER_LOCALE 初始化语言（未设置时使用默认语言）
pub fn init_from_env() {
    let requested = std::env::var(LOCALE_ENV).unwrap_or_default();
    if requested.trim().is_empty() || !set_locale(&requested) {
        rust_i18n::set_locale(DEFAULT_LOCALE);
    }
}

/// 翻译消息（无参数）
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息（带参数，替换 `%{name}` 占位符）
///
/// # 示例
/// ```no_run
/// use guide_roster_aps::i18n::t_with_args;
/// let msg = t_with_args("warning.no_assignment", &[("date", "2025-08-04")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    let mut result = t(key);
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // locale 为全局状态，测试需串行
    static LOCALE_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_normalize_locale() {
        assert_eq!(normalize_locale("en_US.UTF-8"), Some("en"));
        assert_eq!(normalize_locale("zh"), Some("zh-CN"));
        assert_eq!(normalize_locale("iw"), Some("he"));
        assert_eq!(normalize_locale("fr"), None);
    }

    #[test]
    fn test_set_locale() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        assert!(set_locale("en"));
        assert_eq!(current_locale(), "en");

        assert!(!set_locale("fr"), "不支持的语言应拒绝");
        assert_eq!(current_locale(), "en");

        set_locale(DEFAULT_LOCALE);
        assert_eq!(current_locale(), "zh-CN");
    }

    #[test]
    fn test_translate_without_args_keeps_placeholders() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale(DEFAULT_LOCALE);
        let msg = t("warning.no_assignment");
        assert!(msg.contains("%{date}"));
        assert!(msg.contains("无可排人员"));
    }

    #[test]
    fn test_translate_with_args() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("zh-CN");
        let msg = t_with_args(
            "warning.insufficient_guides",
            &[("date", "2025-08-04"), ("required", "2"), ("assigned", "1")],
        );
        assert!(msg.contains("2025-08-04"));
        assert!(msg.contains("人数不足"));
        assert!(!msg.contains("%{"));

        set_locale("en");
        let msg = t_with_args("warning.no_assignment", &[("date", "2025-08-04")]);
        assert!(msg.contains("no guide available"));

        set_locale("he");
        let msg = t_with_args("validation.unknown_guide", &[("guide", "42")]);
        assert!(msg.contains("42"));
        assert!(!msg.contains("%{"));

        set_locale(DEFAULT_LOCALE);
    }
}
