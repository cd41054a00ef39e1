//! Prompt assembly.
//!
//! The relay treats prompts as opaque strings; these helpers only build them.

/// System preamble for code generation requests.
pub const CODE_SYSTEM_PROMPT: &str = "你是一个专业的程序员，请根据用户的需求生成高质量的代码。\n\
要求：\n\
1. 代码要规范，有适当的注释\n\
2. 考虑边界情况和错误处理\n\
3. 遵循最佳实践";

/// System preamble for document summarization requests.
pub const SUMMARY_SYSTEM_PROMPT: &str = "你是一个专业的文档摘要专家。\n\
请对给定的文档内容进行摘要，要求：\n\
1. 提取关键信息\n\
2. 保持逻辑清晰\n\
3. 字数控制在原文的1/3以内";

/// Join a system preamble and a user message into one completion prompt.
///
/// Without a preamble the user message is passed through unchanged.
pub fn compose(system: Option<&str>, user: &str) -> String {
    match system {
        Some(system) => format!("{system}\n\n用户: {user}\n\n助手: "),
        None => user.to_string(),
    }
}

/// User message asking for a short article on `topic` in `style`.
pub fn article_template(topic: &str, style: &str) -> String {
    format!(
        "请以{style}的风格，写一篇关于{topic}的文章。\n\
要求：\n\
1. 内容要生动有趣\n\
2. 字数控制在200字左右\n\
3. 结构清晰"
    )
}

/// User message asking for `requirement` implemented in `language`.
pub fn code_request(requirement: &str, language: &str) -> String {
    format!("请用{language}语言实现以下需求：{requirement}")
}
