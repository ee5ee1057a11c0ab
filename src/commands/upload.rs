use crate::api::{Mode, UploadSummary};
use crate::commands::{controller, Out};
use crate::error::{Error, ErrorType, IntoResult};
use crate::{utils, Config, Result};
use std::path::Path;

/// Uploads the bank statement at `path` and reports how many transactions the statement server
/// now holds.
///
/// # Errors
/// - `ErrorType::Request` if `path` cannot be read.
/// - `ErrorType::Remote` if the statement server could not import it.
pub async fn upload(config: Config, mode: Mode, path: &Path) -> Result<Out<UploadSummary>> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            Error::msg(
                ErrorType::Request,
                format!("'{}' is not a file", path.display()),
            )
        })?;
    let contents = utils::read_bytes(path)
        .await
        .pub_result(ErrorType::Request)?;

    let controller = controller(&config, mode)?;
    let summary = controller.upload_statement(&file_name, contents).await?;
    let total = controller.view().await.len();
    Ok(Out::new(
        format!(
            "{}: imported {} transactions from {file_name}, {total} in total",
            summary.message, summary.imported
        ),
        summary,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_upload() {
        let env = TestEnv::new().await;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("march.csv");
        let statement = "date,withdrawal_or_deposit,transaction_type,details,amount,balance,category,subcategory\n\
            03/01/25,Withdrawal,Debit Card Purchase,SHELL OIL 5512,-38.02,1782.71,Gas,Gas\n\
            03/02/25,Withdrawal,Debit Card Purchase,KROGER #781 TOLEDO OH,-102.55,1680.16,,\n";
        utils::write(&path, statement).await.unwrap();

        let out = upload(env.config(), Mode::Test, &path).await.unwrap();
        assert_eq!(out.structure().unwrap().imported, 2);
        assert!(out.message().ends_with("12 in total"));
        assert_eq!(env.get_state().transactions.len(), 12);
    }

    #[tokio::test]
    async fn test_upload_missing_file() {
        let env = TestEnv::new().await;
        let dir = TempDir::new().unwrap();
        let err = upload(env.config(), Mode::Test, &dir.path().join("nope.pdf"))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Request);
        assert_eq!(env.get_state().transactions.len(), 10);
    }
}
