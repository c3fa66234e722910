fn main() {
    episode_shuffle::cli::run();
}
