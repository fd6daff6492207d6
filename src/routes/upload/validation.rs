use std::fmt;

use percent_encoding::percent_decode_str;

/// 允许的图片扩展名；.svg 因可携带脚本被排除
const ALLOWED_EXTENSIONS: [&str; 7] = [".jpg", ".jpeg", ".png", ".webp", ".gif", ".bmp", ".tiff"];

/// 原始文件名长度上限
const MAX_FILENAME_LENGTH: usize = 255;

/// 净化后文件名长度上限
const MAX_SANITIZED_LENGTH: usize = 100;

/// 提示性的文件大小上限（4 MiB）
pub const MAX_FILE_SIZE: u64 = 4 * 1024 * 1024;

/// 文件名校验失败的具体原因，端点层据此返回区分性的 4xx
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileValidationError {
    EmptyFileName,
    FileNameTooLong,
    DisallowedType,
    FileTooLarge,
    UnsafeAfterSanitize,
    InvalidUserId,
}

impl fmt::Display for FileValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            FileValidationError::EmptyFileName => "文件名不能为空",
            FileValidationError::FileNameTooLong => "文件名过长",
            FileValidationError::DisallowedType => {
                "不支持的文件类型，仅允许 JPEG/PNG/WebP/GIF/BMP/TIFF 图片"
            }
            FileValidationError::FileTooLarge => "文件大小超过 4MB 上限",
            FileValidationError::UnsafeAfterSanitize => "文件名净化后不再合法",
            FileValidationError::InvalidUserId => "用户ID格式不合法",
        };
        write!(f, "{}", msg)
    }
}

impl std::error::Error for FileValidationError {}

/// 取小写扩展名（含点）；无点或点在开头时视为没有扩展名
fn file_extension(name: &str) -> String {
    match name.rfind('.') {
        None | Some(0) => String::new(),
        Some(idx) => name[idx..].to_lowercase(),
    }
}

/// 取去掉扩展名的部分
fn file_stem(name: &str) -> &str {
    match name.rfind('.') {
        None => name,
        Some(idx) => &name[..idx],
    }
}

fn check_length(name: &str) -> Result<(), FileValidationError> {
    if name.is_empty() {
        return Err(FileValidationError::EmptyFileName);
    }
    if name.chars().count() > MAX_FILENAME_LENGTH {
        return Err(FileValidationError::FileNameTooLong);
    }
    Ok(())
}

/// 判断扩展名是否在允许列表中（大小写不敏感），任何输入都不会 panic
pub fn is_allowed_file_type(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    let ext = file_extension(name);
    !ext.is_empty() && ALLOWED_EXTENSIONS.contains(&ext.as_str())
}

/// 删除两个及以上连续点组成的序列，单个点保留
fn strip_dot_runs(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut run = 0usize;
    for c in input.chars() {
        if c == '.' {
            run += 1;
            continue;
        }
        if run == 1 {
            out.push('.');
        }
        run = 0;
        out.push(c);
    }
    if run == 1 {
        out.push('.');
    }
    out
}

/// 将不可信文件名净化为可安全用作对象键的形式
///
/// 步骤顺序：百分号解码（失败则按原文处理）、去掉斜杠与空字节、
/// 删除连续点、替换白名单之外的字符、禁止点开头、限长，
/// 最后重新校验扩展名——替换步骤可能破坏扩展名，此时必须显式报错
pub fn sanitize_file_name(name: &str) -> Result<String, FileValidationError> {
    check_length(name)?;

    let decoded = match percent_decode_str(name).decode_utf8() {
        Ok(s) => s.into_owned(),
        Err(_) => name.to_string(),
    };

    let no_separators: String = decoded
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0'))
        .collect();

    let mut sanitized: String = strip_dot_runs(&no_separators)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.starts_with('.') {
        sanitized = format!("file_{}", sanitized);
    }

    if sanitized.len() > MAX_SANITIZED_LENGTH {
        let ext = file_extension(&sanitized);
        let keep = MAX_SANITIZED_LENGTH.saturating_sub(ext.len());
        let stem: String = file_stem(&sanitized).chars().take(keep).collect();
        sanitized = format!("{}{}", stem, ext);
    }

    if !is_allowed_file_type(&sanitized) {
        return Err(FileValidationError::UnsafeAfterSanitize);
    }

    Ok(sanitized)
}

/// 用户ID仅允许字母数字、连字符与下划线
fn is_valid_user_id(user_id: &str) -> bool {
    !user_id.is_empty()
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// 生成带毫秒时间戳的唯一文件名
///
/// 形如 `{user_id}_{净化后主干}_{毫秒时间戳}{扩展名}`，未提供用户ID时省略前缀。
/// 唯一性依赖时间戳粒度加调用者前缀，同一用户同一毫秒才可能冲突
pub fn generate_unique_file_name(
    name: &str,
    user_id: Option<&str>,
) -> Result<String, FileValidationError> {
    check_length(name)?;
    if let Some(id) = user_id {
        if !is_valid_user_id(id) {
            return Err(FileValidationError::InvalidUserId);
        }
    }

    let sanitized = sanitize_file_name(name)?;
    let timestamp = chrono::Utc::now().timestamp_millis();
    let ext = file_extension(&sanitized);
    let stem = file_stem(&sanitized);

    let prefix = user_id.map(|id| format!("{}_", id)).unwrap_or_default();
    Ok(format!("{}{}_{}{}", prefix, stem, timestamp, ext))
}

/// 组合校验：长度、类型、自报大小、净化，返回净化后的文件名
pub fn validate_file(name: &str, size: Option<u64>) -> Result<String, FileValidationError> {
    check_length(name)?;

    if !is_allowed_file_type(name) {
        return Err(FileValidationError::DisallowedType);
    }

    if let Some(size) = size {
        if size > MAX_FILE_SIZE {
            return Err(FileValidationError::FileTooLarge);
        }
    }

    sanitize_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(is_allowed_file_type("photo.jpg"));
        assert!(is_allowed_file_type("photo.JPG"));
        assert!(is_allowed_file_type("photo.PnG"));
        assert!(is_allowed_file_type("archive.tar.webp"));
    }

    #[test]
    fn disallowed_and_missing_extensions_are_rejected() {
        assert!(!is_allowed_file_type("photo.svg"));
        assert!(!is_allowed_file_type("script.exe"));
        assert!(!is_allowed_file_type("noextension"));
        assert!(!is_allowed_file_type(".png"));
        assert!(!is_allowed_file_type(""));
    }

    #[test]
    fn sanitize_strips_path_traversal() {
        let out = sanitize_file_name("../../etc/passwd.png").unwrap();
        assert!(!out.contains('/'));
        assert!(!out.contains(".."));
        assert!(out.ends_with(".png"));
    }

    #[test]
    fn sanitize_decodes_percent_encoded_traversal() {
        let out = sanitize_file_name("%2e%2e%2fetc%2fpasswd.png").unwrap();
        assert!(!out.contains('/'));
        assert!(!out.contains(".."));
        assert!(out.ends_with(".png"));
    }

    #[test]
    fn sanitize_rejects_empty_and_too_long_names() {
        assert_eq!(
            sanitize_file_name(""),
            Err(FileValidationError::EmptyFileName)
        );
        let long = format!("{}.png", "a".repeat(300));
        assert_eq!(
            sanitize_file_name(&long),
            Err(FileValidationError::FileNameTooLong)
        );
    }

    #[test]
    fn sanitize_replaces_special_characters() {
        let out = sanitize_file_name("my photo (1)!.png").unwrap();
        assert_eq!(out, "my_photo__1__.png");
    }

    #[test]
    fn sanitize_prefixes_leading_dot() {
        // 开头的 ".hidden" 去重复点后只剩单点，仍要避免隐藏文件
        let out = sanitize_file_name(".hidden.png").unwrap();
        assert!(out.starts_with("file_"));
        assert!(out.ends_with(".png"));
    }

    #[test]
    fn sanitize_truncates_long_names_preserving_extension() {
        let name = format!("{}.jpeg", "a".repeat(200));
        let out = sanitize_file_name(&name).unwrap();
        assert_eq!(out.len(), 100);
        assert!(out.ends_with(".jpeg"));
    }

    #[test]
    fn mangled_extension_is_an_explicit_error() {
        // '#' 被替换成 '_' 之后扩展名不再合法，必须报错而不是放行
        assert_eq!(
            sanitize_file_name("photo.p#g"),
            Err(FileValidationError::UnsafeAfterSanitize)
        );
    }

    #[test]
    fn unique_name_matches_expected_pattern() {
        let out = generate_unique_file_name("a.png", Some("user-1")).unwrap();
        assert!(out.starts_with("user-1_a_"));
        assert!(out.ends_with(".png"));

        let middle = out
            .strip_prefix("user-1_a_")
            .unwrap()
            .strip_suffix(".png")
            .unwrap();
        assert!(!middle.is_empty());
        assert!(middle.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn unique_name_without_user_id_has_no_prefix() {
        let out = generate_unique_file_name("a.png", None).unwrap();
        assert!(out.starts_with("a_"));
        assert!(out.ends_with(".png"));
    }

    #[test]
    fn invalid_user_id_is_rejected() {
        assert_eq!(
            generate_unique_file_name("a.png", Some("user/1")),
            Err(FileValidationError::InvalidUserId)
        );
        assert_eq!(
            generate_unique_file_name("a.png", Some("")),
            Err(FileValidationError::InvalidUserId)
        );
    }

    #[test]
    fn validate_file_distinguishes_failure_kinds() {
        assert_eq!(
            validate_file("script.exe", None),
            Err(FileValidationError::DisallowedType)
        );
        assert_eq!(
            validate_file("a.png", Some(MAX_FILE_SIZE + 1)),
            Err(FileValidationError::FileTooLarge)
        );
        assert_eq!(validate_file("a.png", Some(1024)), Ok("a.png".to_string()));
    }
}
