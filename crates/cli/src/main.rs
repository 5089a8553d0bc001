//! # PhotoMint CLI
//!
//! 透かしサービスのHTTP APIを呼び出すコマンドラインツール。
//! `inspect-payload` のみサービスに接続せず、ローカルのPayload Codecでデコードする。

mod cli;
mod client;

use std::path::Path;

use anyhow::Context;
use base64::Engine;
use clap::Parser;
use photomint_core::image_codec::b64;
use photomint_types::{
    EmbedRequest, ExtractRequest, ProvenanceRecord, VerifyExpectations, VerifyRequest,
};
use serde::Serialize;

use crate::cli::{Cli, Command, EmbedArgs, ExtractArgs, VerifyArgs};
use crate::client::ServiceClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = ServiceClient::new(&cli.service_url);

    match cli.command {
        Command::Health => print_json(&client.health().await?),
        Command::Embed(args) => run_embed(&client, args).await,
        Command::Extract(args) => run_extract(&client, args).await,
        Command::Verify(args) => run_verify(&client, args).await,
        Command::InspectPayload(args) => print_json(&inspect_payload(&args.payload)?),
    }
}

async fn run_embed(client: &ServiceClient, args: EmbedArgs) -> anyhow::Result<()> {
    let request = EmbedRequest {
        image: Some(read_image_b64(&args.image)?),
        token_id: Some(args.token_id),
        creator_address: Some(args.creator),
        custom_data: Some(args.custom_data),
        output_format: args.format.map(|f| f.as_str().to_string()),
        quality: args.quality,
    };
    let mut response = client.embed(&request).await?;

    let bytes = b64()
        .decode(&response.watermarked_image)
        .context("透かし入り画像のBase64デコードに失敗しました")?;
    std::fs::write(&args.out, &bytes)
        .with_context(|| format!("{} への書き込みに失敗しました", args.out.display()))?;
    eprintln!("透かし入り画像を {} に保存しました", args.out.display());

    // 画像本体は書き出し済みのため、表示からは省く
    response.watermarked_image = String::new();
    print_json(&response)
}

async fn run_extract(client: &ServiceClient, args: ExtractArgs) -> anyhow::Result<()> {
    let request = ExtractRequest {
        image: Some(read_image_b64(&args.image)?),
        expected_payload_size: args.expected_size,
    };
    print_json(&client.extract(&request).await?)
}

async fn run_verify(client: &ServiceClient, args: VerifyArgs) -> anyhow::Result<()> {
    let request = VerifyRequest {
        image: Some(read_image_b64(&args.image)?),
        expectations: VerifyExpectations {
            expected_sha256: args.expected_sha256,
            expected_token_id: args.expected_token_id,
            expected_creator: args.expected_creator,
        },
    };
    print_json(&client.verify(&request).await?)
}

/// ペイロード文字列をデコードする。チェックサム不一致や形式不正はエラー。
fn inspect_payload(payload: &str) -> anyhow::Result<ProvenanceRecord> {
    photomint_core::decode_payload(payload.as_bytes())
        .context("ペイロードの形式が不正、またはチェックサムが一致しません")
}

fn read_image_b64(path: &Path) -> anyhow::Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("{} を読み込めません", path.display()))?;
    Ok(b64().encode(bytes))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
