use pixel_banana::sanitize::MAX_OUTPUT_CHARS;
use pixel_banana::{strip_thinking, Sanitizer};

const SAMPLES: &[&str] = &[
    "<think>planning...</think>答：你好",
    "<THINK>\nstep one\nstep two\n</THINK>\n\nSure, here it is.",
    "<thinking attr=\"x\">a</thinking>b<analysis>c</analysis>d",
    "```analysis\nthe user wants a joke\n```\nWhy did the banana go to the doctor?",
    "思考：用户在打招呼\n我应该友好地回复\n\n你好！",
    "Thought: maybe rain\n\nIt might rain later.",
    "Let me see.</think> Final Answer: 42",
    "结论：明天晴。",
    "Assistant: Hello!\n\n\n  How are you?   ",
    "text before <reasoning>never closed",
    "<|assistant_thought|>hidden?<scratchpad/> visible",
    "答案：先说这个。答案：再说这个。",
    "<think>step one</analysis>SECRET</think>ok",
    "   ",
    "",
];

#[test]
fn test_think_span_content_never_survives() {
    let raw = "前言<think>SECRET PLAN</think>正文<think>\nMORE\nSECRET\n</think>结尾";
    let clean = strip_thinking(raw);
    assert_eq!(clean, "前言正文结尾");
    assert!(!clean.contains("SECRET"));
    assert!(!clean.contains("MORE"));
}

#[test]
fn test_span_ends_only_at_its_own_closing_tag() {
    let clean = strip_thinking("<think>step one</analysis>SECRET</think>ok");
    assert_eq!(clean, "ok");
    assert!(!clean.contains("SECRET"));

    assert_eq!(
        strip_thinking("<analysis>outer<think>inner</think>HIDDEN</analysis>shown"),
        "shown"
    );
}

#[test]
fn test_reasoning_then_labelled_answer() {
    assert_eq!(strip_thinking("<think>planning...</think>答：你好"), "你好");
}

#[test]
fn test_unterminated_tag_keeps_text_before_it() {
    assert_eq!(strip_thinking("<think>reasoning forever"), "");
    assert_eq!(strip_thinking("好的<think>reasoning forever"), "好的");
    assert_eq!(strip_thinking("text before <reasoning>never closed"), "text before");
}

#[test]
fn test_empty_and_blank_input() {
    assert_eq!(strip_thinking(""), "");
    assert_eq!(strip_thinking(" \n\t \n"), "");
}

#[test]
fn test_fenced_reasoning_block_is_removed() {
    assert_eq!(
        strip_thinking("```analysis\nthe user wants a joke\n```\nWhy did the banana go to the doctor?"),
        "Why did the banana go to the doctor?"
    );
    assert_eq!(
        strip_thinking("```python\nprint('hi')\n```"),
        "```python\nprint('hi')\n```"
    );
}

#[test]
fn test_leading_reasoning_paragraph_is_removed() {
    assert_eq!(
        strip_thinking("思考：用户在打招呼\n我应该友好地回复\n\n你好！"),
        "你好！"
    );
    assert_eq!(strip_thinking("Thought: maybe rain\n\nIt might rain later."), "It might rain later.");
}

#[test]
fn test_stray_closing_tags_are_dropped() {
    assert_eq!(strip_thinking("Let me see.</think> Final Answer: 42"), "42");
    assert_eq!(
        strip_thinking("<|assistant_thought|>hidden?<scratchpad/> visible"),
        "hidden? visible"
    );
}

#[test]
fn test_final_answer_marker_keeps_what_follows() {
    assert_eq!(strip_thinking("结论：明天晴。"), "明天晴。");
    assert_eq!(strip_thinking("I compared both.\nAnswer: the blue one"), "the blue one");
}

#[test]
fn test_blank_lines_and_trailing_space_are_collapsed() {
    assert_eq!(
        strip_thinking("Assistant: Hello!\n\n\n  How are you?   "),
        "Hello!\n  How are you?"
    );
}

#[test]
fn test_output_respects_character_budget() {
    let long = "香蕉".repeat(2000);
    assert_eq!(strip_thinking(&long).chars().count(), MAX_OUTPUT_CHARS);

    let sanitizer = Sanitizer::new(400);
    for sample in SAMPLES.iter().copied().chain([long.as_str()]) {
        assert!(sanitizer.strip(sample).chars().count() <= 400);
    }
}

#[test]
fn test_strip_is_idempotent() {
    let sanitizer = Sanitizer::default();
    for sample in SAMPLES {
        let once = sanitizer.strip(sample);
        assert_eq!(sanitizer.strip(&once), once, "input: {:?}", sample);
    }
}

#[test]
fn test_plain_text_passes_through() {
    assert_eq!(strip_thinking("今天也要多喝水哦！"), "今天也要多喝水哦！");
}
