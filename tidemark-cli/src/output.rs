//! Terminal presentation of command progress

use tidemark::ErrorChain;

pub fn show_info(message: impl AsRef<str>) {
    println!("INFO: {}", message.as_ref());
}

pub fn show_verbose(message: impl AsRef<str>) {
    println!("VERB: {}", message.as_ref());
}

/// Print an error with its causes to stderr
pub fn show_error(err: &anyhow::Error) {
    let message = match err.downcast_ref::<tidemark::Error>() {
        Some(err) => {
            let chain = ErrorChain::new(err);
            log::debug!(
                "[{}] {}",
                chain.root_cause().error_code(),
                chain.format_for_log()
            );
            chain.format_for_display()
        }
        None => format!("{:#}", err),
    };
    eprintln!("ERRO: {}", message);
}
