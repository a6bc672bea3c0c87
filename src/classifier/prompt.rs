//! Prompt text for intent classification.
//!
//! The shop's customers write Turkish, so the instructions are Turkish too.

use crate::types::{Intent, LabeledExample, Message};

/// Render retrieved neighbours as reference lines. Empty input renders to
/// an empty string so the zero-shot prompt carries no dangling header.
pub fn render_retrieved(examples: &[&LabeledExample]) -> String {
    if examples.is_empty() {
        return String::new();
    }
    let mut block = String::from("\nReferans Örnekler:\n");
    for example in examples {
        block.push_str(&format!(
            "- Kullanıcı: '{}' -> Niyet: {}\n",
            example.text, example.intent
        ));
    }
    block
}

/// Render a fixed few-shot sample as reference lines.
pub fn render_few_shot<'a>(examples: impl IntoIterator<Item = (&'a str, Intent)>) -> String {
    let lines: String = examples
        .into_iter()
        .map(|(text, intent)| format!("- Kullanıcı: '{text}' -> Intent: {intent}\n"))
        .collect();
    if lines.is_empty() {
        return String::new();
    }
    format!("\nREFERANS ÖRNEKLER:\n{lines}")
}

/// System + user messages for retrieval-augmented classification.
pub fn retrieval_messages(message: &str, context: &str) -> Vec<Message> {
    let system = format!(
        "Sen bir sınıflandırma asistanısın. Aşağıdaki mesajın niyetini (intent) belirle.\n\
         \n\
         Kategoriler: {labels}\n\
         \n\
         {context}\n\
         \n\
         Sadece kategori ismini yaz, başka hiçbir şey yazma.",
        labels = Intent::label_list(),
    );
    vec![
        Message::system(system),
        Message::user(format!("Mesaj: {message}\nNiyet:")),
    ]
}

/// Single user message for static few-shot classification.
pub fn few_shot_messages(message: &str, few_shot: &str) -> Vec<Message> {
    let prompt = format!(
        "Sen bir sınıflandırma motorusun.\n\
         Görevin: Kullanıcı mesajını aşağıdaki kategorilerden birine eşleştirmek.\n\
         \n\
         KATEGORİLER:\n\
         {labels}\n\
         \n\
         {few_shot}\n\
         \n\
         KURALLAR:\n\
         1. Sadece kategori ismini (intent) yaz.\n\
         2. Açıklama yapma, noktalama işareti koyma.\n\
         3. Mesaj şunlardan birine tam uymuyorsa en yakını seç.\n\
         \n\
         Mesaj: \"{message}\"\n\
         Intent:",
        labels = Intent::label_list(),
    );
    vec![Message::user(prompt)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    #[test]
    fn retrieved_lines_use_arrow_format() {
        let ex = LabeledExample::new("baklava istiyorum", Intent::OrderDessert);
        let block = render_retrieved(&[&ex]);
        assert!(block.contains("'baklava istiyorum' -> Niyet: order_dessert"));
    }

    #[test]
    fn empty_context_renders_nothing() {
        assert_eq!(render_retrieved(&[]), "");
        assert_eq!(render_few_shot(std::iter::empty()), "");
    }

    #[test]
    fn retrieval_prompt_lists_every_label() {
        let messages = retrieval_messages("selam", "");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        for intent in Intent::ALL {
            assert!(messages[0].content.contains(intent.as_str()));
        }
        assert_eq!(messages[1].content, "Mesaj: selam\nNiyet:");
    }

    #[test]
    fn few_shot_prompt_is_one_user_message() {
        let block = render_few_shot([("sütlaç lütfen", Intent::OrderDessert)]);
        let messages = few_shot_messages("tiramisu var mı", &block);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
        assert!(messages[0].content.contains("'sütlaç lütfen' -> Intent: order_dessert"));
        assert!(messages[0].content.contains("Mesaj: \"tiramisu var mı\""));
    }
}
