//! LLM 原始输出的文本净化
//!
//! 模型可能把 JSON 包在 markdown 代码栏里，或在 JSON 前后附带说明文字；
//! 这里只做文本剥离，不做语义解析。

/// 剥离 markdown 代码栏（```...```），没有代码栏时原样返回
pub fn strip_code_fences(content: &str) -> String {
    let trimmed = content.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    let lines: Vec<&str> = trimmed.lines().collect();
    if lines.len() < 2 {
        return trimmed.to_string();
    }
    let mut end = lines.len();
    if lines[end - 1].trim_start().starts_with("```") {
        end -= 1;
    }
    lines[1..end].join("\n").trim().to_string()
}

/// 从应答中提取 JSON 文本：优先 ```json 栏，其次通用代码栏，再退到花括号配对
pub fn extract_json(content: &str) -> String {
    if let Some(start) = content.find("```json") {
        let rest = &content[start + 7..];
        if let Some(end) = rest.find("```") {
            return rest[..end].trim().to_string();
        }
    }
    if content.trim_start().starts_with("```") {
        return strip_code_fences(content);
    }

    // 花括号配对：取第一个完整的顶层对象
    if let Some(start) = content.find('{') {
        let mut depth = 0usize;
        for (i, ch) in content[start..].char_indices() {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return content[start..start + i + 1].to_string();
                    }
                }
                _ => {}
            }
        }
    }

    content.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_plain_passthrough() {
        assert_eq!(strip_code_fences(r#"{"a": 1}"#), r#"{"a": 1}"#);
    }

    #[test]
    fn test_strip_fenced_json() {
        let fenced = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(fenced), "{\"a\": 1}");
    }

    #[test]
    fn test_extract_with_commentary() {
        let content = "Here is the result:\n```json\n{\"decision\": \"allowed\"}\n```\nLet me know!";
        assert_eq!(extract_json(content), "{\"decision\": \"allowed\"}");
    }

    #[test]
    fn test_extract_bare_object_with_prefix() {
        let content = "Sure: {\"decision\": \"denied\", \"nested\": {\"x\": 1}} trailing";
        assert_eq!(
            extract_json(content),
            "{\"decision\": \"denied\", \"nested\": {\"x\": 1}}"
        );
    }
}
