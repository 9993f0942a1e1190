//! 占位符扫描

/// 扫描结果片段
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// 普通文本，`%%` 已还原为 `%`
    Literal(String),
    /// 按（点分）名称引用参数的占位符
    Placeholder(String),
}

/// 把字符串拆分为普通文本和占位符
///
/// `%%` 表示转义的百分号。为空或包含空白的 `%...%` 不是占位符，按原文保留，
/// 因此 `"50% off, 20% more"` 这样的普通文本不受影响。
pub fn parse(input: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = input;

    while let Some(start) = rest.find('%') {
        literal.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        if let Some(stripped) = after.strip_prefix('%') {
            literal.push('%');
            rest = stripped;
            continue;
        }

        match after.find('%') {
            Some(end) if is_placeholder_name(&after[..end]) => {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Placeholder(after[..end].to_string()));
                rest = &after[end + 1..];
            }
            _ => {
                literal.push('%');
                rest = after;
            }
        }
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    segments
}

/// 检查是否包含占位符
pub fn contains_placeholder(input: &str) -> bool {
    parse(input)
        .iter()
        .any(|segment| matches!(segment, Segment::Placeholder(_)))
}

fn is_placeholder_name(candidate: &str) -> bool {
    !candidate.is_empty() && !candidate.chars().any(char::is_whitespace)
}
