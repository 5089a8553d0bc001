//! CLIのコマンド定義と引数パース。

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// デフォルトのサービスURL。
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:5001";

/// PhotoMint 透かしサービスのCLI。
#[derive(Debug, Parser)]
#[command(name = "photomint-cli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// 透かしサービスのURL
    #[arg(long, env = "PHOTOMINT_URL", default_value = DEFAULT_SERVICE_URL, global = true)]
    pub service_url: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// サービスの稼働確認
    Health,
    /// 画像に来歴ペイロードを埋め込む
    Embed(EmbedArgs),
    /// 画像から透かしを抽出する
    Extract(ExtractArgs),
    /// 画像を多段階検証する
    Verify(VerifyArgs),
    /// ペイロード文字列をローカルでデコードする
    InspectPayload(InspectArgs),
}

/// 出力画像フォーマット。
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Jpeg,
    Png,
}

impl FormatArg {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatArg::Jpeg => "JPEG",
            FormatArg::Png => "PNG",
        }
    }
}

#[derive(Debug, Parser)]
pub struct EmbedArgs {
    /// 入力画像ファイル
    #[arg(short, long)]
    pub image: PathBuf,

    /// NFTのトークンID
    #[arg(short, long)]
    pub token_id: String,

    /// クリエイターのウォレットアドレス
    #[arg(short, long)]
    pub creator: String,

    /// 任意の付加データ（ペイロードに収まらない場合は切り詰め）
    #[arg(long, default_value = "")]
    pub custom_data: String,

    /// 出力フォーマット
    #[arg(short, long, value_enum)]
    pub format: Option<FormatArg>,

    /// JPEG品質（1〜100）
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: Option<u8>,

    /// 透かし入り画像の書き出し先
    #[arg(short, long)]
    pub out: PathBuf,
}

#[derive(Debug, Parser)]
pub struct ExtractArgs {
    /// 入力画像ファイル
    #[arg(short, long)]
    pub image: PathBuf,

    /// 埋め込み時のフレーム長（バイト）
    #[arg(long)]
    pub expected_size: Option<usize>,
}

#[derive(Debug, Parser)]
pub struct VerifyArgs {
    /// 入力画像ファイル
    #[arg(short, long)]
    pub image: PathBuf,

    /// 期待するSHA-256（JPEG品質95で再エンコードした画像のもの）
    #[arg(long)]
    pub expected_sha256: Option<String>,

    /// 期待するトークンID
    #[arg(long)]
    pub expected_token_id: Option<String>,

    /// 期待するクリエイターアドレス
    #[arg(long)]
    pub expected_creator: Option<String>,
}

#[derive(Debug, Parser)]
pub struct InspectArgs {
    /// `v1|token|creator|ts[|custom]|crc` 形式のペイロード
    pub payload: String,
}
