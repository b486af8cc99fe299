fn main() {
    retinal_ai_frontend::start();
}
