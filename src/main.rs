use clap::Parser;
use much::config::Args;
use much::mnist;
use much::train::Trainer;
use std::process::ExitCode;

fn run(args: &Args) -> much::Result<()> {
    let mut train_set = mnist::load_dataset(&args.train_images, &args.train_labels)?;
    let test_set = mnist::load_dataset(&args.test_images, &args.test_labels)?;
    if let Some(limit) = args.limit {
        train_set.truncate(limit);
    }

    let input_len = train_set.images.first().map_or(28 * 28, much::Tensor::capacity);
    let mut trainer = Trainer::new(args.train_config(input_len))?;

    trainer.fit(&train_set)?;

    let accuracy = trainer.evaluate(&test_set)?;
    println!("Accuracy: {accuracy:.2}%");

    trainer.save_weights(&args.weights)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
