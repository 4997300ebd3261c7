use aircombat::logging::{LogConfig, LogOutput, init_logging, level_from_verbosity, parse_log_level};
use aircombat::render::TracingRenderer;
use aircombat::scenario::ScenarioConfig;
use aircombat::scheduler::{SchedulerControl, run_realtime};
use aircombat::simulation::SimulationEngine;
use clap::{Arg, ArgMatches, Command};
use tracing::info;

fn main() {
    // コマンドライン引数の解析
    let matches = Command::new("aircombat")
        .version("0.1.0")
        .about("空中戦シミュレーション (Air Combat Simulation)")
        .long_about("機体とミサイルの追尾・回避シミュレーション\n\
                     固定周期タイマーで機体の回避旋回とミサイルの追尾を再現します。")
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("FILE")
                .help("シナリオファイル(.yaml)のパスを指定")
                .long_help("実行するシナリオファイル(.yaml)のパスを指定します。\n\
                           指定しない場合、標準設定で実行されます。")
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(clap::ArgAction::SetTrue)
                .help("シナリオの情報のみ表示して終了")
        )
        .arg(
            Arg::new("ticks")
                .short('n')
                .long("ticks")
                .value_name("N")
                .value_parser(clap::value_parser!(u64))
                .help("実行するティック数（シナリオの max_ticks を上書き）")
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_parser(clap::value_parser!(u64))
                .help("乱数シード値を上書き")
        )
        .arg(
            Arg::new("pairs")
                .long("pairs")
                .value_parser(clap::value_parser!(usize))
                .help("機体とミサイルのペア数を上書き")
        )
        .arg(
            Arg::new("speed")
                .long("speed")
                .value_parser(clap::value_parser!(f64))
                .help("時間圧縮倍率を上書き")
        )
        .arg(
            Arg::new("batch")
                .short('b')
                .long("batch")
                .action(clap::ArgAction::SetTrue)
                .help("タイマー待ちなしで一括実行")
        )
        .arg(
            Arg::new("dump-final")
                .long("dump-final")
                .action(clap::ArgAction::SetTrue)
                .help("終了時のロスターをYAMLで出力")
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("TARGET")
                .default_value("console")
                .help("ログ出力先 (console, file, both)")
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("ログレベル (trace, debug, info, warn, error)")
        )
        .arg(
            Arg::new("log-dir")
                .long("log-dir")
                .value_name("DIR")
                .default_value("logs")
                .help("ログファイルの出力ディレクトリ")
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(clap::ArgAction::Count)
                .help("詳細出力レベル (-v: 基本, -vv: 詳細, -vvv: デバッグ)")
        )
        .get_matches();

    let verbose_level = matches.get_count("verbose");

    let _log_guard = match init_logging(&log_config(&matches, verbose_level)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("エラー: ログ初期化に失敗しました: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&matches, verbose_level) {
        eprintln!("エラー: {}", e);
        std::process::exit(1);
    }
}

fn log_config(matches: &ArgMatches, verbose_level: u8) -> LogConfig {
    let output = matches
        .get_one::<String>("log-output")
        .and_then(|s| s.parse::<LogOutput>().map_err(|e| eprintln!("警告: {}", e)).ok())
        .unwrap_or(LogOutput::Console);
    let level = match matches.get_one::<String>("log-level") {
        Some(level) => parse_log_level(level),
        None => level_from_verbosity(verbose_level),
    };

    LogConfig {
        level,
        output,
        log_dir: matches
            .get_one::<String>("log-dir")
            .cloned()
            .unwrap_or_else(|| "logs".to_string()),
        ..LogConfig::default()
    }
}

/// シナリオを読み込み、引数で上書きして実行
fn run(matches: &ArgMatches, verbose_level: u8) -> Result<(), Box<dyn std::error::Error>> {
    let mut scenario = match matches.get_one::<String>("scenario") {
        Some(path) => {
            let scenario = ScenarioConfig::from_file(path)?;
            if verbose_level > 0 {
                println!("シナリオファイル読み込み完了: {}", path);
            }
            scenario
        }
        None => ScenarioConfig::default(),
    };

    if let Some(&ticks) = matches.get_one::<u64>("ticks") {
        scenario.sim.max_ticks = ticks;
    }
    if let Some(&seed) = matches.get_one::<u64>("seed") {
        scenario.sim.seed = seed;
    }
    if let Some(&pairs) = matches.get_one::<usize>("pairs") {
        scenario.sim.pair_count = pairs;
    }
    if let Some(&speed) = matches.get_one::<f64>("speed") {
        scenario.sim.speed_multiplier = speed;
    }

    // 情報表示のみの場合
    if matches.get_flag("info") {
        scenario.validate()?;
        scenario.print_summary();
        return Ok(());
    }

    scenario.print_summary();
    println!();

    let mut engine = SimulationEngine::new(scenario, verbose_level)?;
    let mut renderer = TracingRenderer::new();
    engine.initialize(&mut renderer);

    let stats = if matches.get_flag("batch") {
        engine.run(&mut renderer)
    } else {
        execute_realtime(&mut engine, &mut renderer)?
    };

    println!();
    println!("=== 実行結果 ===");
    println!("総ティック数: {}", stats.ticks);
    println!("撃墜ペア数: {}", stats.pairs_destroyed);
    println!("ロスター再生成: {}回", stats.respawns);
    println!("中心復帰旋回: {}回 (上限到達: {}回)", stats.forced_corrections, stats.correction_fallbacks);
    println!("任意旋回: {}回", stats.random_turns);
    println!("再照準: {}回 (加速: {}回)", stats.retargets, stats.missile_accelerations);
    println!("描画フレーム数: {}", renderer.frames);

    if matches.get_flag("dump-final") {
        println!();
        println!("{}", serde_yaml::to_string(&engine.snapshot())?);
    }

    Ok(())
}

/// 固定周期タイマーで max_ticks まで実行
fn execute_realtime(
    engine: &mut SimulationEngine,
    renderer: &mut TracingRenderer,
) -> Result<aircombat::models::SimulationStats, Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    let (control, control_rx) = SchedulerControl::new(engine.speed_multiplier());
    let max_ticks = engine.max_ticks();

    info!(
        tick_period_ms = engine.tick_period().as_millis() as u64,
        max_ticks,
        "リアルタイム実行を開始します"
    );

    let summary = runtime.block_on(run_realtime(
        engine,
        renderer,
        control_rx,
        control.shutdown_handle(),
        Some(max_ticks),
    ));

    Ok(summary.stats)
}
