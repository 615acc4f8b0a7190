//! Language model prompts, one structure per meeting type.
//!
//! Prompts are Chinese-language instructions ending in a JSON skeleton the
//! model must fill. Two optional leading notes are attached conditionally: a
//! speaker note when the transcript carries diarization tags, and a glossary
//! note when the term table is non-empty.
use crate::model::{GlossaryTerm, MeetingType};

/// Token that marks a diarized transcript.
const SPEAKER_TOKEN: &str = "[SPEAKER_";

const SPEAKER_NOTE: &str = "注意：转录文本包含说话人标签（如 [SPEAKER_00]）。\
请利用说话人标签区分发言人，在提取参与者、决策和行动项时保留发言人归属。";

const JSON_ONLY: &str = "请只输出 JSON，不要输出任何解释文字、前言或代码块标记。";

const GENERAL_STRUCTURE: &str = r#"{
  "summary": "会议总结",
  "keyTopics": ["讨论的主要话题"],
  "highlights": ["进展顺利的事项"],
  "lowlights": ["存在问题的事项"],
  "decisions": ["达成的决定"],
  "actions": [{"task": "任务", "owner": "负责人", "deadline": "期限", "priority": "high|medium|low"}],
  "participants": ["参会人"],
  "duration": "会议时长",
  "meetingType": "general"
}"#;

const WEEKLY_STRUCTURE: &str = r#"{
  "summary": "周会总结",
  "teamKPI": {
    "overview": "团队整体指标概况",
    "individuals": [{"name": "成员", "kpi": "指标", "status": "on-track|at-risk|completed"}]
  },
  "announcements": ["通知事项"],
  "projectReviews": [{
    "project": "项目名",
    "progress": "进展",
    "followUps": ["跟进事项"],
    "highlights": ["亮点"],
    "lowlights": ["不足"],
    "risks": [{"impact": "high|medium|low", "mitigation": "缓解措施"}],
    "challenges": ["挑战"]
  }],
  "decisions": ["达成的决定"],
  "actions": [{"task": "任务", "owner": "负责人", "deadline": "期限", "priority": "high|medium|low"}],
  "participants": ["参会人"],
  "nextMeeting": "下次会议安排"
}"#;

const TECH_STRUCTURE: &str = r#"{
  "summary": "技术讨论总结",
  "topics": [{"topic": "议题", "discussion": "讨论内容", "conclusion": "结论"}],
  "highlights": ["亮点"],
  "lowlights": ["不足"],
  "actions": [{"task": "任务", "owner": "负责人", "deadline": "期限", "priority": "high|medium|low", "estimate": "工作量估计"}],
  "knowledgeBase": [{"title": "知识点", "content": "内容"}],
  "participants": ["参会人"],
  "techStack": ["涉及的技术栈"]
}"#;

const CUSTOMER_STRUCTURE: &str = r#"{
  "summary": "客户会议总结",
  "customerInfo": {"company": "客户公司", "attendees": ["客户参会人"]},
  "awsAttendees": ["AWS 参会人"],
  "customerNeeds": [{"need": "需求", "priority": "high|medium|low", "background": "背景"}],
  "painPoints": [{"point": "痛点", "detail": "详情"}],
  "solutionsDiscussed": [{"solution": "方案", "awsServices": ["涉及服务"], "customerFeedback": "客户反馈"}],
  "commitments": [{"party": "AWS|客户", "commitment": "承诺事项", "owner": "负责人", "deadline": "期限"}],
  "nextSteps": [{"task": "任务", "owner": "负责人", "deadline": "期限", "priority": "high|medium|low"}],
  "participants": ["参会人"]
}"#;

fn task_header(meeting_type: MeetingType) -> &'static str {
    match meeting_type {
        MeetingType::General => {
            "你是一名专业的会议纪要助手。请根据以下会议转录，生成结构化的会议纪要。"
        }
        MeetingType::Weekly => {
            "你是一名专业的会议纪要助手。请根据以下周会转录，生成包含团队指标与项目进展的结构化周会纪要。"
        }
        MeetingType::Tech => {
            "你是一名专业的会议纪要助手。请根据以下技术会议转录，生成包含议题结论与知识沉淀的结构化纪要。"
        }
        MeetingType::Customer => {
            "你是一名专业的会议纪要助手。请根据以下客户会议转录，生成面向客户跟进的结构化纪要。"
        }
    }
}

fn structure(meeting_type: MeetingType) -> &'static str {
    match meeting_type {
        MeetingType::General => GENERAL_STRUCTURE,
        MeetingType::Weekly => WEEKLY_STRUCTURE,
        MeetingType::Tech => TECH_STRUCTURE,
        MeetingType::Customer => CUSTOMER_STRUCTURE,
    }
}

fn glossary_note(terms: &[GlossaryTerm]) -> Option<String> {
    if terms.is_empty() {
        return None;
    }

    let mut note = String::from(
        "以下是团队术语表。转录中出现发音或拼写相近的词时，请统一为标准术语：\n",
    );
    for term in terms {
        note.push_str("- ");
        note.push_str(&term.term);
        if !term.aliases.is_empty() {
            note.push_str("（别名: ");
            note.push_str(&term.aliases.join("、"));
            note.push('）');
        }
        if !term.definition.is_empty() {
            note.push_str(": ");
            note.push_str(&term.definition);
        }
        note.push('\n');
    }
    Some(note)
}

/// Build the full prompt for one report.
pub fn build(meeting_type: MeetingType, transcript: &str, terms: &[GlossaryTerm]) -> String {
    let mut prompt = String::new();

    if transcript.contains(SPEAKER_TOKEN) {
        prompt.push_str(SPEAKER_NOTE);
        prompt.push_str("\n\n");
    }
    if let Some(note) = glossary_note(terms) {
        prompt.push_str(&note);
        prompt.push('\n');
    }

    prompt.push_str(task_header(meeting_type));
    prompt.push_str("\n\n输出必须是符合以下结构的 JSON：\n");
    prompt.push_str(structure(meeting_type));
    prompt.push_str("\n\n");
    prompt.push_str(JSON_ONLY);
    prompt.push_str("\n\n会议转录：\n");
    prompt.push_str(transcript);
    prompt
}
