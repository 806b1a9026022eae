//! Prompt templates sent to the generation service.
//!
//! ## Prompt Types
//!
//! - **Opening**: first statement of a party when it enters the courtroom
//! - **Reply**: a party's answer to one of the judge's questions
//! - **Analysis**: JSON-only psychological analysis of a submitted judgment
//!
//! The prosecutor's demanded sentence comes from the case record and is quoted
//! verbatim in both the opening and the reply prompt.

use crate::cases::Case;
use crate::session::{DialogueTurn, Judgment, Role, Speaker};

/// User content for an opening statement.
pub const OPENING_USER_TEXT: &str = "재판을 시작하며 첫 진술을 해주세요.";

/// User content for the analysis call.
pub const ANALYSIS_USER_TEXT: &str = "사용자 판결에 대한 실시간 MLOps 데이터 분석을 수행하십시오.";

/// Label for the judge's turns in the transcript.
const JUDGE_LABEL: &str = "사용자(판사)";

const NO_ASSISTANT_PHRASES: &str = "절대 \"질문해 주십시오\", \"무엇이든 물어보세요\" 등의 인공지능 같은 도우미 멘트를 붙이지 마십시오. 질문에 대답하는 것이 아니라 당신이 먼저 발언하는 상황입니다.";

/// Build the instruction for a party's opening statement.
pub fn build_opening_instruction(case: &Case, role: Role) -> String {
    let mut prompt = String::new();
    match role {
        Role::Prosecutor => {
            prompt.push_str("당신은 다음 사건의 엄정한 '검사(Prosecutor)' 역할을 맡았습니다.\n");
            prompt.push_str(&case.context_block());
            prompt.push_str("\n\n");
            prompt.push_str("당신은 지금 실제 형사 재판정에서 판사를 향해 **기소 요지(범죄 사실, 죄질의 중대성)를 엄숙히 낭독하고 구형(어떠한 처벌을 내려달라)**하는 첫 발언을 시작해야 합니다.\n");
            prompt.push_str(NO_ASSISTANT_PHRASES);
            prompt.push('\n');
            prompt.push_str("\"존경하는 재판장님,\" 으로 시작하여 사건의 악랄함이나 처벌의 필요성을 강조하고, 최종적으로 실감나는 검사의 기소 진술(약 3~4문장 1문단)만을 즉시 작성하십시오.\n");
            prompt.push_str(&format!(
                "핵심 지시사항: 당신이 마지막에 구형해야 할 형량은 실제 역사적 기록에 따라 **반드시 '{}'**이어야 합니다. 다른 형량을 추론해서는 안 되며, 이 구형량 부분을 반드시 **마크다운 굵게 처리**하여 강조**하십시오.",
                case.prosecutor_request()
            ));
        }
        Role::Defendant => {
            prompt.push_str("당신은 다음 사건의 '피고인(Defendant)' 역할을 맡았습니다.\n");
            prompt.push_str(&case.context_block());
            prompt.push_str("\n\n");
            prompt.push_str("당신은 지금 실제 형사 재판정에서 판사를 향해 **최후 변론 또는 첫 모두 진술**을 하는 상황입니다.\n");
            prompt.push_str(NO_ASSISTANT_PHRASES);
            prompt.push('\n');
            prompt.push_str("\"재판장님,\" 으로 시작하여 자신의 억울함, 어쩔 수 없었던 정황, 혹은 뼈저린 반성 등을 표현하며 선처를 호소하거나 무죄를 강변하는 실감나는 피고인의 진술(약 3~4문장 1문단)만을 즉시 작성하십시오.\n");
            prompt.push_str("중요: 본인의 억울한 점이나 가장 선처를 받아야 하는 **핵심 항변 사유, 그리고 최종적으로 원하는 바(선처 호소, 무죄 주장 등)는 반드시 **마크다운 굵게 처리**하여 강조**하십시오.");
        }
    }
    prompt
}

/// Render prior turns as `speaker: text` lines.
pub fn format_transcript(role: Role, history: &[DialogueTurn]) -> String {
    history
        .iter()
        .map(|turn| {
            let label = match turn.speaker {
                Speaker::User => JUDGE_LABEL,
                Speaker::Ai => role.title(),
            };
            format!("{}: {}", label, turn.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the instruction for a party's answer to the judge.
///
/// `history` must not contain `question` itself.
pub fn build_reply_instruction(
    case: &Case,
    role: Role,
    history: &[DialogueTurn],
    question: &str,
) -> String {
    let name = role.title();
    let mut prompt = format!("당신은 다음 사건의 '{name}' 역할을 맡았습니다.\n");
    prompt.push_str(&case.context_block());

    if role == Role::Prosecutor {
        prompt.push_str(&format!(
            "\n당신이 이 재판에서 구형하는 형벌은 실제 역사적 기록에 따라 **반드시 '{}'**이어야 합니다. 판사가 형량을 묻거나 답변 중 형량을 언급할 때는 반드시 이 구형량을 고수하십시오.",
            case.prosecutor_request()
        ));
    }

    prompt.push_str("\n\n");
    prompt.push_str(&format!(
        "사용자는 이 사건을 판결하는 판사입니다. 당신은 '{name}'의 입장에서 진행 중인 재판정에서 판사의 심문에 답변하는 중입니다.\n"
    ));
    prompt.push_str("'존경하는 재판장님'과 같은 상투적인 인사말만 남기고 답변을 끊거나, \"무엇이든 질문해 주십시오\" 같은 안내원 태도를 취하지 마십시오. 판사의 질문이나 지적에 대해 당신의 입장(검사는 엄벌/기소 유지 우려 표명, 피고인은 변호/선처/무죄 호소)을 강변하며 실질적인 대답을 하십시오. 사람처럼 연기하십시오.\n");
    prompt.push_str("중요: 문맥상 가장 중요한 당신의 **주장, 논거, 구형량, 혹은 호소하는 바는 반드시 **마크다운 굵게 처리**하여 강조**하십시오.\n\n");

    prompt.push_str("이전 대화:\n");
    prompt.push_str(&format_transcript(role, history));
    prompt.push_str("\n\n");
    prompt.push_str(&format!("판사의 질문: {question}\n\n"));
    prompt.push_str(&format!("{name}의 대답:"));
    prompt
}

/// Build the instruction for the JSON analysis of a judgment.
///
/// `learning_context` is empty until enough verdicts have accumulated.
pub fn build_analysis_instruction(case: &Case, judgment: &Judgment, learning_context: &str) -> String {
    let mut prompt = String::new();
    prompt.push_str("당신은 판사가 제출한 판결문과 그 기저에 깔린 심리를 분석하는 고도의 법률 심리 분석 AI입니다.\n");
    prompt.push_str(learning_context);
    prompt.push('\n');

    prompt.push_str("[분석 지침]\n");
    prompt.push_str("1. emotionScore (0~100): 판단에 개입된 동정, 분노, 보복심 등 감정적 동기의 비율입니다. 법리보다 직관이나 감정에 치우친 표현(예: \"그냥 사형\", \"나쁘니까\")이 많을수록 높은 점수를 부여하세요.\n");
    prompt.push_str("2. legalScore (0~100): 제출된 판결 이유가 제공된 법 조항 및 비례의 원칙과 얼마나 부합하는지 나타냅니다. 구체적 법리 근거 없이 극단적 형량을 부과한 경우 매우 낮은 점수를 부여하세요.\n");
    prompt.push_str("3. emotionReason & legalReason: 각각의 점수를 부여한 구체적인 근거를 한국어로 설명하세요.\n");
    prompt.push_str("4. biases: 판결에서 엿보이는 편향성 키워드 2개를 추출하세요.\n\n");

    prompt.push_str("[사건 정보]\n");
    prompt.push_str(&format!("제목: {}\n", case.title));
    prompt.push_str(&format!("개요: {}\n", case.scenario));
    prompt.push_str(&format!("관련 법: {}\n\n", case.law));

    prompt.push_str("[사용자의 판결]\n");
    let sentence = judgment
        .sentence
        .as_deref()
        .map(|s| format!("({s})"))
        .unwrap_or_default();
    prompt.push_str(&format!("판결: {} {}\n", judgment.verdict, sentence));
    prompt.push_str(&format!("판결 이유: \"{}\"\n\n", judgment.reason));

    prompt.push_str("*반드시* 아래 JSON 형식으로만 응답하세요:\n");
    prompt.push_str(
        "{\n  \"emotionScore\": [숫자],\n  \"emotionReason\": \"[설명]\",\n  \"legalScore\": [숫자],\n  \"legalReason\": \"[설명]\",\n  \"biases\": [\"키워드1\", \"키워드2\"]\n}",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cases::CaseCatalog;
    use crate::session::Verdict;

    fn bread_case() -> Case {
        CaseCatalog::builtin()
            .unwrap()
            .find("bread-thief")
            .unwrap()
            .clone()
    }

    #[test]
    fn test_prosecutor_opening_quotes_demand() {
        let case = bread_case();
        let prompt = build_opening_instruction(&case, Role::Prosecutor);
        assert!(prompt.contains("**반드시 '징역 1년'**"));
        assert!(prompt.contains(&case.title));
        assert!(prompt.contains("존경하는 재판장님"));
    }

    #[test]
    fn test_defendant_opening_has_no_demand() {
        let case = bread_case();
        let prompt = build_opening_instruction(&case, Role::Defendant);
        assert!(!prompt.contains("징역 1년"));
        assert!(prompt.contains("피고인(Defendant)"));
    }

    #[test]
    fn test_reply_includes_transcript_and_question() {
        let case = bread_case();
        let history = vec![
            DialogueTurn::ai(Role::Defendant, "배가 고팠습니다."),
            DialogueTurn::user(Role::Defendant, "전과가 있지 않습니까?"),
        ];
        let prompt = build_reply_instruction(&case, Role::Defendant, &history, "왜 훔쳤습니까?");
        assert!(prompt.contains("이전 대화:\n피고인: 배가 고팠습니다.\n사용자(판사): 전과가 있지 않습니까?"));
        assert!(prompt.contains("판사의 질문: 왜 훔쳤습니까?"));
        assert!(prompt.ends_with("피고인의 대답:"));
        assert!(!prompt.contains("구형하는 형벌"));
    }

    #[test]
    fn test_prosecutor_reply_keeps_demand() {
        let case = bread_case();
        let prompt = build_reply_instruction(&case, Role::Prosecutor, &[], "형량은?");
        assert!(prompt.contains("**반드시 '징역 1년'**"));
        assert!(prompt.ends_with("검사의 대답:"));
    }

    #[test]
    fn test_analysis_prompt_includes_judgment() {
        let case = bread_case();
        let judgment =
            Judgment::new(Verdict::Guilty, Some("사형".into()), false, "그냥 사형").unwrap();
        let prompt = build_analysis_instruction(&case, &judgment, "");
        assert!(prompt.contains("판결: 유죄 (사형)"));
        assert!(prompt.contains("판결 이유: \"그냥 사형\""));
        assert!(prompt.contains("\"emotionScore\""));
        assert!(!prompt.contains("축적된"));
    }

    #[test]
    fn test_analysis_prompt_embeds_learning_context() {
        let case = bread_case();
        let judgment = Judgment::new(Verdict::NotGuilty, None, false, "생계형").unwrap();
        let prompt = build_analysis_instruction(&case, &judgment, "\n[축적된 국민 법감정 데이터 (120건)]\n");
        assert!(prompt.contains("[축적된 국민 법감정 데이터 (120건)]"));
    }
}
