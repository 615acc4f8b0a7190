//! HTML email rendering.
//!
//! One template covers every report shape; sections render only when the
//! report carries them, so a sparse or unknown report degrades to the
//! summary alone. Values are HTML-escaped by the template engine.
use base64::{engine::general_purpose::STANDARD, Engine as _};
use handlebars::Handlebars;
use serde_json::json;

use crate::Error;

const EMAIL_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="margin:0;padding:0;background-color:#f2f3f3;font-family:'Helvetica Neue',Arial,'PingFang SC','Microsoft YaHei',sans-serif;">
<table role="presentation" width="100%" cellpadding="0" cellspacing="0" style="background-color:#f2f3f3;padding:24px 0;">
<tr><td align="center">
<table role="presentation" width="640" cellpadding="0" cellspacing="0" style="background-color:#ffffff;border-radius:8px;overflow:hidden;">
<tr><td style="background-color:#232f3e;padding:24px 32px;">
<h1 style="margin:0;color:#ffffff;font-size:20px;">会议纪要</h1>
<p style="margin:8px 0 0;color:#aab7c4;font-size:14px;">{{meetingName}}</p>
</td></tr>
<tr><td style="padding:24px 32px;color:#16191f;font-size:14px;line-height:1.6;">
{{#if report.summary}}
<h2 style="font-size:16px;border-left:4px solid #ff9900;padding-left:8px;">总结</h2>
<p>{{report.summary}}</p>
{{/if}}
{{#if report.keyTopics}}
<h2 style="font-size:16px;border-left:4px solid #ff9900;padding-left:8px;">主要话题</h2>
<ul>{{#each report.keyTopics}}<li>{{this}}</li>{{/each}}</ul>
{{/if}}
{{#if report.highlights}}
<h2 style="font-size:16px;border-left:4px solid #ff9900;padding-left:8px;">亮点</h2>
<ul>{{#each report.highlights}}<li>{{this}}</li>{{/each}}</ul>
{{/if}}
{{#if report.lowlights}}
<h2 style="font-size:16px;border-left:4px solid #ff9900;padding-left:8px;">不足</h2>
<ul>{{#each report.lowlights}}<li>{{this}}</li>{{/each}}</ul>
{{/if}}
{{#if report.teamKPI}}
<h2 style="font-size:16px;border-left:4px solid #ff9900;padding-left:8px;">团队 KPI</h2>
<p>{{report.teamKPI.overview}}</p>
{{#if report.teamKPI.individuals}}
<table width="100%" cellpadding="6" cellspacing="0" style="border-collapse:collapse;font-size:13px;">
<tr style="background-color:#f2f3f3;"><th align="left">成员</th><th align="left">指标</th><th align="left">状态</th></tr>
{{#each report.teamKPI.individuals}}
<tr style="border-bottom:1px solid #eaeded;"><td>{{this.name}}</td><td>{{this.kpi}}</td><td>{{this.status}}</td></tr>
{{/each}}
</table>
{{/if}}
{{/if}}
{{#if report.announcements}}
<h2 style="font-size:16px;border-left:4px solid #ff9900;padding-left:8px;">通知事项</h2>
<ul>{{#each report.announcements}}<li>{{this}}</li>{{/each}}</ul>
{{/if}}
{{#if report.projectReviews}}
<h2 style="font-size:16px;border-left:4px solid #ff9900;padding-left:8px;">项目进展</h2>
{{#each report.projectReviews}}
<p style="margin-bottom:4px;"><strong>{{this.project}}</strong> — {{this.progress}}</p>
{{#if this.risks}}
<table width="100%" cellpadding="6" cellspacing="0" style="border-collapse:collapse;font-size:13px;">
<tr style="background-color:#f2f3f3;"><th align="left">风险影响</th><th align="left">缓解措施</th></tr>
{{#each this.risks}}
<tr style="border-bottom:1px solid #eaeded;"><td>{{this.impact}}</td><td>{{this.mitigation}}</td></tr>
{{/each}}
</table>
{{/if}}
{{/each}}
{{/if}}
{{#if report.topics}}
<h2 style="font-size:16px;border-left:4px solid #ff9900;padding-left:8px;">技术议题</h2>
<table width="100%" cellpadding="6" cellspacing="0" style="border-collapse:collapse;font-size:13px;">
<tr style="background-color:#f2f3f3;"><th align="left">议题</th><th align="left">讨论</th><th align="left">结论</th></tr>
{{#each report.topics}}
<tr style="border-bottom:1px solid #eaeded;"><td>{{this.topic}}</td><td>{{this.discussion}}</td><td>{{this.conclusion}}</td></tr>
{{/each}}
</table>
{{/if}}
{{#if report.knowledgeBase}}
<h2 style="font-size:16px;border-left:4px solid #ff9900;padding-left:8px;">知识沉淀</h2>
{{#each report.knowledgeBase}}
<p><strong>{{this.title}}</strong><br>{{this.content}}</p>
{{/each}}
{{/if}}
{{#if report.techStack}}
<h2 style="font-size:16px;border-left:4px solid #ff9900;padding-left:8px;">技术栈</h2>
<p>{{#each report.techStack}}{{this}}{{#unless @last}}、{{/unless}}{{/each}}</p>
{{/if}}
{{#if report.customerInfo}}
<h2 style="font-size:16px;border-left:4px solid #ff9900;padding-left:8px;">客户信息</h2>
<p><strong>{{report.customerInfo.company}}</strong></p>
{{#if report.customerInfo.attendees}}
<p>客户参会人：{{#each report.customerInfo.attendees}}{{this}}{{#unless @last}}、{{/unless}}{{/each}}</p>
{{/if}}
{{#if report.awsAttendees}}
<p>AWS 参会人：{{#each report.awsAttendees}}{{this}}{{#unless @last}}、{{/unless}}{{/each}}</p>
{{/if}}
{{/if}}
{{#if report.customerNeeds}}
<h2 style="font-size:16px;border-left:4px solid #ff9900;padding-left:8px;">客户需求</h2>
<table width="100%" cellpadding="6" cellspacing="0" style="border-collapse:collapse;font-size:13px;">
<tr style="background-color:#f2f3f3;"><th align="left">需求</th><th align="left">优先级</th><th align="left">背景</th></tr>
{{#each report.customerNeeds}}
<tr style="border-bottom:1px solid #eaeded;"><td>{{this.need}}</td><td>{{this.priority}}</td><td>{{this.background}}</td></tr>
{{/each}}
</table>
{{/if}}
{{#if report.painPoints}}
<h2 style="font-size:16px;border-left:4px solid #ff9900;padding-left:8px;">痛点</h2>
<ul>{{#each report.painPoints}}<li><strong>{{this.point}}</strong>：{{this.detail}}</li>{{/each}}</ul>
{{/if}}
{{#if report.solutionsDiscussed}}
<h2 style="font-size:16px;border-left:4px solid #ff9900;padding-left:8px;">讨论的方案</h2>
{{#each report.solutionsDiscussed}}
<p><strong>{{this.solution}}</strong><br>{{this.customerFeedback}}</p>
{{/each}}
{{/if}}
{{#if report.commitments}}
<h2 style="font-size:16px;border-left:4px solid #ff9900;padding-left:8px;">承诺事项</h2>
<table width="100%" cellpadding="6" cellspacing="0" style="border-collapse:collapse;font-size:13px;">
<tr style="background-color:#f2f3f3;"><th align="left">承诺方</th><th align="left">内容</th><th align="left">负责人</th><th align="left">期限</th></tr>
{{#each report.commitments}}
<tr style="border-bottom:1px solid #eaeded;"><td>{{this.party}}</td><td>{{this.commitment}}</td><td>{{this.owner}}</td><td>{{this.deadline}}</td></tr>
{{/each}}
</table>
{{/if}}
{{#if report.decisions}}
<h2 style="font-size:16px;border-left:4px solid #ff9900;padding-left:8px;">决定</h2>
<ul>{{#each report.decisions}}<li>{{this}}</li>{{/each}}</ul>
{{/if}}
{{#if report.actions}}
<h2 style="font-size:16px;border-left:4px solid #ff9900;padding-left:8px;">行动项</h2>
<table width="100%" cellpadding="6" cellspacing="0" style="border-collapse:collapse;font-size:13px;">
<tr style="background-color:#f2f3f3;"><th align="left">任务</th><th align="left">负责人</th><th align="left">期限</th><th align="left">优先级</th></tr>
{{#each report.actions}}
<tr style="border-bottom:1px solid #eaeded;"><td>{{this.task}}</td><td>{{this.owner}}</td><td>{{this.deadline}}</td><td>{{this.priority}}</td></tr>
{{/each}}
</table>
{{/if}}
{{#if report.nextSteps}}
<h2 style="font-size:16px;border-left:4px solid #ff9900;padding-left:8px;">后续步骤</h2>
<table width="100%" cellpadding="6" cellspacing="0" style="border-collapse:collapse;font-size:13px;">
<tr style="background-color:#f2f3f3;"><th align="left">任务</th><th align="left">负责人</th><th align="left">期限</th><th align="left">优先级</th></tr>
{{#each report.nextSteps}}
<tr style="border-bottom:1px solid #eaeded;"><td>{{this.task}}</td><td>{{this.owner}}</td><td>{{this.deadline}}</td><td>{{this.priority}}</td></tr>
{{/each}}
</table>
{{/if}}
{{#if report.participants}}
<h2 style="font-size:16px;border-left:4px solid #ff9900;padding-left:8px;">参会人</h2>
<p>{{#each report.participants}}{{this}}{{#unless @last}}、{{/unless}}{{/each}}</p>
{{/if}}
{{#if report.nextMeeting}}
<h2 style="font-size:16px;border-left:4px solid #ff9900;padding-left:8px;">下次会议</h2>
<p>{{report.nextMeeting}}</p>
{{/if}}
{{#if report.duration}}
<p style="color:#687078;">会议时长：{{report.duration}}</p>
{{/if}}
</td></tr>
<tr><td style="background-color:#f2f3f3;padding:16px 32px;color:#687078;font-size:12px;">
本邮件由会议纪要流水线自动生成。
</td></tr>
</table>
</td></tr>
</table>
</body>
</html>
"#;

/// Render the delivery email body for one report.
pub fn render_report_html(
    meeting_name: &str,
    report: &serde_json::Value,
) -> Result<String, Error> {
    let handle_bars = Handlebars::new();
    let data = json!({
        "meetingName": meeting_name,
        "report": report,
    });
    handle_bars
        .render_template(EMAIL_TEMPLATE, &data)
        .map_err(|e| Error::ExecutionError(format!("email rendering failed: {e}")))
}

/// MIME-encode a subject line as UTF-8 (RFC 2047 encoded-word). ASCII-only
/// subjects pass through untouched.
pub fn encode_subject(subject: &str) -> String {
    if subject.is_ascii() {
        subject.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(subject.as_bytes()))
    }
}
