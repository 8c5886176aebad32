use anyhow::Result;

use crate::chat::attachment::Attachment;
use crate::chat::ChatRequest;
use crate::config::RecollectConfig;

/// Send one message through the full chat pipeline and print the reply.
///
/// `attachment` is a name under the uploads directory, as the upload layer
/// records it.
pub async fn ask(
    config: &RecollectConfig,
    prompt: &str,
    chat_id: &str,
    username: &str,
    model_id: Option<&str>,
    attachment: Option<(&str, &str)>,
) -> Result<()> {
    let responder = crate::server::build_responder(config)?;

    let request = ChatRequest {
        username: username.to_string(),
        chat_id: chat_id.to_string(),
        prompt: prompt.to_string(),
        model_id: model_id
            .unwrap_or(&config.generation.default_model)
            .to_string(),
        attachment: attachment
            .map(|(stored_as, content_type)| Attachment::new(content_type, stored_as)),
    };

    let reply = responder.respond(&request).await?;

    if let Some(report) = &reply.ingested {
        eprintln!("[ingested {} {} record(s)]", report.records_added, report.kind);
    }
    if reply.degraded {
        eprintln!("[degraded: a collaborator was unavailable; see logs]");
    }
    if let Some(model) = &reply.model {
        eprintln!(
            "[{model}{}]",
            if reply.context_used { ", with retrieved context" } else { "" }
        );
    }
    println!("{}", reply.text);

    Ok(())
}
