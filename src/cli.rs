use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use image::RgbaImage;
use std::path::{Path, PathBuf};

use crate::app::{Action, Session};
use crate::capture::{load_still, render_surface};
use crate::config::AppConfig;
use crate::inventory::{
    copy_plan, format_expiry, open_file_storage, render_report, share_plan, FileStorage,
    FormField, Storage,
};
use crate::ocr::prepare_for_ocr;
use crate::paths;
use crate::selection::coords::to_screen_space;
use crate::selection::{fit_surface, DisplayRect, PointerInput, SelectionRect};

#[derive(Parser)]
#[command(name = "stock-scan")]
#[command(about = "사진에서 품번을 인식해 재고 목록을 만드는 도구", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 사진의 선택 영역을 인식하고, 수량이 주어지면 목록에 추가
    Scan {
        /// 사진 파일 경로
        #[arg(required = true)]
        image: PathBuf,

        /// 선택 영역 (표시 영역 좌표 x0,y0,x1,y1)
        #[arg(short, long, value_parser = parse_rect)]
        rect: SelectionRect,

        /// 표시 영역 크기 (WxH, 기본값은 설정 파일)
        #[arg(long, value_parser = parse_size)]
        container: Option<(f64, f64)>,

        /// 전처리된 영역 이미지를 저장할 경로
        #[arg(long)]
        save_crop: Option<PathBuf>,

        /// 수량 (주어지면 항목을 추가)
        #[arg(short, long)]
        quantity: Option<String>,

        /// 포장 단위
        #[arg(short, long)]
        unit: Option<String>,

        /// 유통기한 (예: 20251201)
        #[arg(short, long)]
        expiry: Option<String>,

        /// 인식 결과 대신 사용할 품번
        #[arg(short, long)]
        code: Option<String>,
    },

    /// 선택 영역의 전처리 결과만 저장 (인식 없음)
    Preview {
        #[arg(required = true)]
        image: PathBuf,

        #[arg(short, long, value_parser = parse_rect)]
        rect: SelectionRect,

        #[arg(long, value_parser = parse_size)]
        container: Option<(f64, f64)>,

        /// 출력 PNG 경로
        #[arg(short, long)]
        output: PathBuf,
    },

    /// 항목을 직접 추가
    Add {
        #[arg(short, long)]
        code: String,

        #[arg(short, long)]
        quantity: String,

        #[arg(short, long)]
        unit: Option<String>,

        #[arg(short, long)]
        expiry: Option<String>,
    },

    /// 목록 보기
    List,

    /// 항목 삭제 (목록에 표시된 번호)
    Delete {
        index: usize,
    },

    /// 목록 전체 삭제
    Clear,

    /// 목록 내보내기 (클립보드, 실패 시 파일)
    Export {
        /// 공유 대상으로 먼저 보내기
        #[arg(long)]
        share: bool,

        /// 표준 출력으로만 출력
        #[arg(long)]
        stdout: bool,
    },

    /// 포장 단위 관리
    Units {
        #[command(subcommand)]
        command: UnitsCommand,
    },
}

#[derive(Subcommand)]
pub enum UnitsCommand {
    List,
    Add { name: String },
    Remove { name: String },
}

/// Parses `x0,y0,x1,y1`.
fn parse_rect(s: &str) -> Result<SelectionRect, String> {
    let values: Vec<f64> = s
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid number in {:?}: {}", s, e))?;

    match values.as_slice() {
        [x0, y0, x1, y1] => Ok(SelectionRect::from_corners((*x0, *y0), (*x1, *y1))),
        _ => Err(format!("expected x0,y0,x1,y1, got {:?}", s)),
    }
}

/// Parses `WxH`.
fn parse_size(s: &str) -> Result<(f64, f64), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got {:?}", s))?;
    let w: f64 = w.trim().parse().map_err(|_| format!("invalid width in {:?}", s))?;
    let h: f64 = h.trim().parse().map_err(|_| format!("invalid height in {:?}", s))?;
    if w <= 0.0 || h <= 0.0 {
        return Err(format!("size must be positive, got {:?}", s));
    }
    Ok((w, h))
}

fn with_container(config: &AppConfig, container: Option<(f64, f64)>) -> AppConfig {
    let mut config = config.clone();
    if let Some((w, h)) = container {
        config.viewport.container_width = w;
        config.viewport.container_height = h;
    }
    config
}

fn open_session(config: &AppConfig) -> Session<FileStorage> {
    Session::open(open_file_storage(&paths::get_storage_dir()), config)
}

fn print_notices(session: &mut Session<FileStorage>) {
    for notice in session.take_notices() {
        println!("! {}", notice);
    }
}

fn download_dir(config: &AppConfig) -> PathBuf {
    config
        .export
        .download_dir
        .clone()
        .unwrap_or_else(paths::get_exports_dir)
}

pub fn run(cli: Cli, config: &AppConfig) -> Result<()> {
    match cli.command {
        Commands::Scan {
            image,
            rect,
            container,
            save_crop,
            quantity,
            unit,
            expiry,
            code,
        } => {
            let config = with_container(config, container);
            scan(&image, rect, &config, save_crop.as_deref(), quantity, unit, expiry, code)
        }
        Commands::Preview {
            image,
            rect,
            container,
            output,
        } => preview(&image, rect, &with_container(config, container), &output),
        Commands::Add {
            code,
            quantity,
            unit,
            expiry,
        } => {
            let mut session = open_session(config);
            fill_form(&mut session, Some(code), quantity, unit, expiry)?;
            session.dispatch(Action::SubmitItem)?;
            print_notices(&mut session);
            println!("추가됨 ({}개 항목)", session.state().items.len());
            Ok(())
        }
        Commands::List => {
            let session = open_session(config);
            let items = &session.state().items;
            if items.is_empty() {
                println!("목록이 비어 있습니다");
            }
            for (i, item) in items.iter().enumerate() {
                println!(
                    "{:>3}. {} | {} {} | {}",
                    i + 1,
                    item.product_number,
                    item.quantity,
                    item.unit,
                    format_expiry(&item.expiry_date)
                );
            }
            Ok(())
        }
        Commands::Delete { index } => {
            let mut session = open_session(config);
            if index == 0 {
                bail!(crate::error::InputError::NoSuchItem(0));
            }
            session.dispatch(Action::DeleteItem(index - 1))?;
            print_notices(&mut session);
            println!("{}번 항목을 삭제했습니다", index);
            Ok(())
        }
        Commands::Clear => {
            let mut session = open_session(config);
            session.dispatch(Action::ClearItems)?;
            print_notices(&mut session);
            println!("목록을 비웠습니다");
            Ok(())
        }
        Commands::Export { share, stdout } => {
            let session = open_session(config);
            if stdout {
                match render_report(&session.state().items) {
                    Some(report) => println!("{}", report),
                    None => println!("내보낼 항목이 없습니다"),
                }
                return Ok(());
            }

            let channels = if share {
                share_plan(&config.export, download_dir(config))
            } else {
                copy_plan(download_dir(config))
            };
            let delivered = session.export(&channels)?;
            match delivered.path {
                Some(path) => println!("목록을 파일로 저장했습니다: {}", path.display()),
                None => println!("목록을 보냈습니다 ({})", delivered.channel),
            }
            Ok(())
        }
        Commands::Units { command } => {
            let mut session = open_session(config);
            match command {
                UnitsCommand::List => {}
                UnitsCommand::Add { name } => session.dispatch(Action::AddUnit(name))?,
                UnitsCommand::Remove { name } => session.dispatch(Action::RemoveUnit(name))?,
            }
            print_notices(&mut session);
            println!("{}", session.state().units.as_slice().join(", "));
            Ok(())
        }
    }
}

fn fill_form(
    session: &mut Session<FileStorage>,
    code: Option<String>,
    quantity: String,
    unit: Option<String>,
    expiry: Option<String>,
) -> Result<()> {
    if let Some(code) = code {
        session.dispatch(Action::EditForm(FormField::ProductNumber, code))?;
    }
    session.dispatch(Action::EditForm(FormField::Quantity, quantity))?;
    if let Some(unit) = unit {
        session.dispatch(Action::EditForm(FormField::Unit, unit))?;
    }
    if let Some(expiry) = expiry {
        session.dispatch(Action::EditForm(FormField::ExpiryDate, expiry))?;
    }
    Ok(())
}

/// Loads the image, drags over `rect` and lets the session recognize it.
#[allow(clippy::too_many_arguments)]
fn scan(
    image: &Path,
    rect: SelectionRect,
    config: &AppConfig,
    save_crop: Option<&Path>,
    quantity: Option<String>,
    unit: Option<String>,
    expiry: Option<String>,
    code: Option<String>,
) -> Result<()> {
    let source = load_still(image)?;
    let mut session = open_session(config);
    session.load_image(&source)?;

    replay_selection(&mut session, rect)?;

    if let (Some(path), Some(crop)) = (save_crop, committed_crop(&session)) {
        crop.save(path)
            .context(format!("Failed to save crop to {}", path.display()))?;
        println!("전처리 이미지: {}", path.display());
    }

    print_notices(&mut session);
    if let Some(recognition) = &session.state().recognition {
        println!("인식 엔진: {}", recognition.engine);
        println!("인식 텍스트: {}", recognition.raw_text);
        println!("품번 후보: {}", recognition.extracted_code);
    }

    if let Some(quantity) = quantity {
        fill_form(&mut session, code, quantity, unit, expiry)?;
        session.dispatch(Action::SubmitItem)?;
        print_notices(&mut session);
        let added = session.state().items.last();
        if let Some(item) = added {
            println!(
                "추가됨: {} | {} | {} | {}",
                item.product_number, item.quantity, item.unit, item.expiry_date
            );
        }
    }
    Ok(())
}

/// Replays `rect` as pointer events so it goes through the same mapping as a drag.
fn replay_selection<S: Storage>(session: &mut Session<S>, rect: SelectionRect) -> Result<()> {
    let surface = session
        .state()
        .surface
        .context("Image produced an empty display surface")?;
    let display = DisplayRect::unscaled(surface);
    let viewport = session.state().viewport;

    let (sx0, sy0) = to_screen_space(rect.x0, rect.y0, &display, surface, &viewport);
    let (sx1, sy1) = to_screen_space(rect.x1, rect.y1, &display, surface, &viewport);
    session.dispatch(Action::PointerDown(PointerInput::mouse(sx0, sy0), display))?;
    session.dispatch(Action::PointerMove(PointerInput::mouse(sx1, sy1), display))?;
    session.dispatch(Action::PointerUp(None, display))?;
    Ok(())
}

/// The normalized crop of the committed selection, as it was sent to OCR.
fn committed_crop<S: Storage>(session: &Session<S>) -> Option<RgbaImage> {
    let selection = session.state().tracker.committed()?;
    let bitmap = session.surface()?;
    Some(prepare_for_ocr(
        bitmap,
        selection.to_pixel_rect(),
        &session.state().config().preprocess,
    ))
}

/// Writes the normalized crop of `rect` without running OCR.
fn preview(image: &Path, rect: SelectionRect, config: &AppConfig, output: &Path) -> Result<()> {
    let source = load_still(image)?;
    let (w, h) = source.dimensions();
    let surface = fit_surface(
        w,
        h,
        config.viewport.container_width,
        config.viewport.container_height,
    );
    let bitmap = render_surface(&source, surface);

    let crop = prepare_for_ocr(&bitmap, rect.to_pixel_rect(), &config.preprocess);
    crop.save(output)
        .context(format!("Failed to save preview to {}", output.display()))?;

    println!(
        "{}x{} 표시 영역에서 {}x{} 이미지를 저장했습니다: {}",
        surface.width.round(),
        surface.height.round(),
        crop.width(),
        crop.height(),
        output.display()
    );
    Ok(())
}
