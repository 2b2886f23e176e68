fn main() -> std::process::ExitCode {
    i3_workspaces::__main()
}
