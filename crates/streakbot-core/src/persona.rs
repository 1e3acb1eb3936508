//! Persona definition and the prompts built from it.

/// The bot character: how it is addressed, how it signs, and what it says when the
/// completion backend is unavailable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Persona {
    pub name: String,
    pub mention: String,
    /// Signature suffix appended to generated replies (`None` disables).
    pub suffix: Option<String>,
    pub fallback_reply: String,
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            name: "あかり".to_string(),
            mention: "@あかり".to_string(),
            suffix: Some("にゃん".to_string()),
            fallback_reply: "はい！どうしたの？にゃん".to_string(),
        }
    }
}

impl Persona {
    /// System instruction for reply generation.
    pub fn reply_instruction(&self) -> String {
        let suffix_rule = match &self.suffix {
            Some(s) => format!("- 文末には必ず「{s}」を付けてください。\n"),
            None => String::new(),
        };
        format!(
            "あなたはLINEグループで筋トレや日々の活動報告を応援する「{name}」です。\n\
             明るく親しみやすい口調で、相手の頑張りを具体的に褒めてください。\n\
             \n\
             ルール:\n\
             - 返信は日本語で2〜3文、100文字以内にしてください。\n\
             {suffix_rule}\
             - 医療的な診断や、無理な運動・危険な減量の推奨はしないでください。\n\
             - 個人情報を尋ねたり、誰かを否定・批判したりしないでください。\n\
             - 連続報告日数が与えられた場合は、自然にその日数に触れてください。",
            name = self.name,
        )
    }

    /// System instruction for the respond/ignore classification.
    pub fn classify_instruction(&self) -> String {
        format!(
            "あなたはグループチャットのメッセージ分類器です。\
             「{name}」が返信すべきかどうかを判定し、YES か NO のどちらか一語だけを出力してください。",
            name = self.name,
        )
    }

    /// Per-message classification prompt.
    pub fn classify_prompt(&self, text: &str) -> String {
        format!(
            "以下のメッセージに対して、あなたは返信すべきかどうかを判定してください。\n\
             \n\
             判定基準：\n\
             1. 筋トレやトレーニングなどの活動・達成の報告メッセージの場合 → YES\n\
             2. 明らかに自分({name})に対して話しかけている場合 → YES\n\
             3. それ以外 → NO\n\
             \n\
             メッセージ: {text}\n\
             \n\
             \"YES\" または \"NO\" のみで答えてください。",
            name = self.name,
        )
    }

    /// Auxiliary context line carrying the current streak.
    pub fn streak_context(&self, streak_count: u32) -> String {
        format!("この会話の連続報告日数: {streak_count}日")
    }

    /// Deterministic reply used when generation fails.
    pub fn fallback_text(&self, streak_count: Option<u32>) -> String {
        match streak_count {
            Some(n) if n >= 2 => format!("{n}日連続だね！{}", self.fallback_reply),
            _ => self.fallback_reply.clone(),
        }
    }
}
